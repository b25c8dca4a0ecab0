//! Board Configuration
//!
//! Everything that used to be a per-board `#define` is carried in a
//! [`BoardConfig`] value: clocks, cache geometry, load address, which storage
//! backends exist and how the root filesystem is named on each of them.
//!
//! The orchestrator branches on this descriptor at runtime, so one build of
//! the decision logic covers every board and can be exercised on a host. The
//! fallback order itself (primary card, secondary card, NAND) is fixed policy
//! and not part of the descriptor.

#![deny(missing_docs)]

use bitflags::bitflags;
use thiserror_no_std::Error;

use crate::memory::{PhysicalAddress, ProbeRegion};
use crate::params::{ParamError, TOKEN_CAPACITY};

pub mod boards;

bitflags! {
    /// Storage backends a board provides
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StorageBackends: u8 {
        /// Primary SD/MMC slot
        const MMC = 1 << 0;
        /// Secondary SD/MMC slot, tried when the primary fails to initialize
        const MMC_SECONDARY = 1 << 1;
        /// Raw NAND flash
        const NAND = 1 << 2;
        /// UBI volumes on NAND
        const UBI = 1 << 3;
    }
}

bitflags! {
    /// Optional loader behaviours
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BootOptions: u8 {
        /// Time the boot with the SoC tick counter and pass it to userspace
        const BENCHMARK = 1 << 0;
        /// Turn the panel backlight on after the banner
        const BACKLIGHT = 1 << 1;
        /// Stop after RAM test and banner (first-stage-only image)
        const STAGE1_ONLY = 1 << 2;
    }
}

/// MMC controller index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmcId(pub u8);

/// One SD/MMC slot and the root filesystem convention used when booting from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmcSlot {
    /// Controller the card sits on
    pub id: MmcId,
    /// Root block device as the kernel names it
    pub root_device: &'static str,
    /// Root filesystem type
    pub fs_type: &'static str,
}

impl MmcSlot {
    /// Slot with the usual `vfat` root filesystem
    pub const fn vfat(id: u8, root_device: &'static str) -> Self {
        Self {
            id: MmcId(id),
            root_device,
            fs_type: "vfat",
        }
    }
}

/// UBI layout on NAND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UbiConfig {
    /// Volume holding the root filesystem
    pub rootfs_volume: &'static str,
    /// MTD partition the kernel must attach for the rootfs, if it is not the default
    pub rootfs_mtd: Option<&'static str>,
}

/// NAND flash setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandConfig {
    /// UBI layout; without it NAND holds nothing the loader can read
    pub ubi: Option<UbiConfig>,
}

/// Board configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A secondary MMC slot needs a primary one to fall back from
    #[error("secondary MMC slot configured without a primary slot")]
    SecondaryWithoutPrimary,
    /// No backend could ever supply a kernel
    #[error("no storage backend configured")]
    NoStorage,
    /// Cache size must be a non-zero multiple of the word size
    #[error("invalid data cache size {0}")]
    InvalidCacheSize(usize),
    /// The RAM self-test would not end inside the uncached window
    #[error("RAM test over 2 x {dcache_size} bytes at {load_address:?} leaves KSEG1")]
    RamTestOutOfRange {
        /// Configured load address
        load_address: PhysicalAddress,
        /// Configured data cache size
        dcache_size: usize,
    },
    /// Clock too slow for the delay loop to make progress
    #[error("CPU clock {0} Hz below the 5 MHz minimum")]
    ClockTooSlow(u32),
    /// A configured string does not fit into a kernel parameter token
    #[error("configured value for `{0}` does not fit a parameter token")]
    TokenTooLong(&'static str),
    /// The default parameter table could not be built
    #[error("parameter table: {0}")]
    Params(#[from] ParamError),
}

/// Board descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Human-readable board name
    pub name: &'static str,
    /// CPU clock in Hz
    pub cpu_hz: u32,
    /// L1 data cache size in bytes
    pub dcache_size: usize,
    /// Physical address the kernel image is loaded to
    pub load_address: PhysicalAddress,
    /// Hardware variant passed to userspace as `hwvariant=`
    pub variant: &'static str,
    /// Default `video=` token (empty for none)
    pub video: &'static str,
    /// Default verbosity token such as `quiet` (empty for none)
    pub loglevel: &'static str,
    /// Primary SD/MMC slot
    pub mmc: Option<MmcSlot>,
    /// Secondary SD/MMC slot
    pub mmc_secondary: Option<MmcSlot>,
    /// NAND flash
    pub nand: Option<NandConfig>,
    /// Optional behaviours
    pub options: BootOptions,
}

/// Longest prefix a configured string gets inside a token (`rootfstype=`)
const LONGEST_PREFIX: usize = "rootfstype=".len();

impl BoardConfig {
    /// Capability summary of the configured storage
    pub fn backends(&self) -> StorageBackends {
        let mut backends = StorageBackends::empty();
        backends.set(StorageBackends::MMC, self.mmc.is_some());
        backends.set(StorageBackends::MMC_SECONDARY, self.mmc_secondary.is_some());
        backends.set(StorageBackends::NAND, self.nand.is_some());
        backends.set(StorageBackends::UBI, self.ubi().is_some());
        backends
    }

    /// UBI layout, if NAND with UBI is configured
    pub fn ubi(&self) -> Option<&UbiConfig> {
        self.nand.as_ref().and_then(|nand| nand.ubi.as_ref())
    }

    /// Check the descriptor for combinations the loader cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        let backends = self.backends();
        if backends.contains(StorageBackends::MMC_SECONDARY) && !backends.contains(StorageBackends::MMC) {
            return Err(ConfigError::SecondaryWithoutPrimary);
        }
        if !backends.intersects(StorageBackends::MMC | StorageBackends::NAND) {
            return Err(ConfigError::NoStorage);
        }
        if self.dcache_size == 0 || self.dcache_size % 4 != 0 {
            return Err(ConfigError::InvalidCacheSize(self.dcache_size));
        }
        if ProbeRegion::new(self.load_address, self.dcache_size).is_none() {
            return Err(ConfigError::RamTestOutOfRange {
                load_address: self.load_address,
                dcache_size: self.dcache_size,
            });
        }
        if self.cpu_hz < 5_000_000 {
            return Err(ConfigError::ClockTooSlow(self.cpu_hz));
        }

        let check = |field: &'static str, value: &str| {
            if value.len() + LONGEST_PREFIX < TOKEN_CAPACITY {
                Ok(())
            } else {
                Err(ConfigError::TokenTooLong(field))
            }
        };
        check("variant", self.variant)?;
        check("video", self.video)?;
        check("loglevel", self.loglevel)?;
        for slot in self.mmc.iter().chain(self.mmc_secondary.iter()) {
            check("root_device", slot.root_device)?;
            check("fs_type", slot.fs_type)?;
        }
        if let Some(ubi) = self.ubi() {
            check("rootfs_volume", ubi.rootfs_volume)?;
            if let Some(mtd) = ubi.rootfs_mtd {
                check("rootfs_mtd", mtd)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for board in [boards::gcw0(), boards::rs90(), boards::a320()] {
            assert_eq!(board.validate(), Ok(()), "{}", board.name);
        }
    }

    #[test]
    fn backends_reflect_configuration() {
        assert_eq!(
            boards::gcw0().backends(),
            StorageBackends::MMC | StorageBackends::MMC_SECONDARY
        );
        assert_eq!(boards::rs90().backends(), StorageBackends::NAND | StorageBackends::UBI);
        assert_eq!(
            boards::a320().backends(),
            StorageBackends::MMC | StorageBackends::NAND | StorageBackends::UBI
        );
    }

    #[test]
    fn secondary_slot_needs_primary() {
        let board = BoardConfig {
            mmc: None,
            ..boards::gcw0()
        };
        assert_eq!(board.validate(), Err(ConfigError::SecondaryWithoutPrimary));
    }

    #[test]
    fn board_without_storage_is_rejected() {
        let board = BoardConfig {
            mmc: None,
            mmc_secondary: None,
            nand: None,
            ..boards::gcw0()
        };
        assert_eq!(board.validate(), Err(ConfigError::NoStorage));
    }

    #[test]
    fn cache_and_clock_are_checked() {
        let board = BoardConfig {
            dcache_size: 1022,
            ..boards::a320()
        };
        assert_eq!(board.validate(), Err(ConfigError::InvalidCacheSize(1022)));

        let board = BoardConfig {
            cpu_hz: 1_000_000,
            ..boards::a320()
        };
        assert_eq!(board.validate(), Err(ConfigError::ClockTooSlow(1_000_000)));
    }

    #[test]
    fn ram_test_must_fit_the_uncached_window() {
        let board = BoardConfig {
            dcache_size: usize::MAX & !3,
            ..boards::a320()
        };
        assert_eq!(
            board.validate(),
            Err(ConfigError::RamTestOutOfRange {
                load_address: boards::DEFAULT_LOAD_ADDRESS,
                dcache_size: usize::MAX & !3,
            })
        );

        let board = BoardConfig {
            load_address: PhysicalAddress::new(0x1FFF_F000),
            dcache_size: 4096,
            ..boards::a320()
        };
        assert!(matches!(board.validate(), Err(ConfigError::RamTestOutOfRange { .. })));

        let board = BoardConfig {
            load_address: PhysicalAddress::new(0x1FFF_E000),
            dcache_size: 4096,
            ..boards::a320()
        };
        assert_eq!(board.validate(), Ok(()));
    }

    #[test]
    fn oversized_variant_is_rejected() {
        let board = BoardConfig {
            variant: "a-hardware-variant-name-far-too-long-to-fit-into-one-token",
            ..boards::gcw0()
        };
        assert_eq!(board.validate(), Err(ConfigError::TokenTooLong("variant")));
    }

    #[test]
    fn nand_without_ubi_has_no_ubi_backend() {
        let board = BoardConfig {
            nand: Some(NandConfig { ubi: None }),
            ..boards::rs90()
        };
        assert_eq!(board.backends(), StorageBackends::NAND);
        assert!(board.ubi().is_none());
    }
}
