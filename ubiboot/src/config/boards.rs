//! Board presets
//!
//! ```text
//! board  SoC      CPU       D-cache  storage
//! gcw0   JZ4770   1008 MHz  16 KB    internal SD (MSC0) -> external SD (MSC1)
//! rs90   JZ4725B   360 MHz  16 KB    NAND/UBI, rootfs on its own MTD
//! a320   JZ4740    336 MHz  16 KB    SD (MSC0) -> NAND/UBI
//! ```

use super::{BoardConfig, BootOptions, MmcSlot, NandConfig, UbiConfig};
use crate::memory::PhysicalAddress;

/// Physical load address shared by all presets (kernel linked at 0x80010000)
pub const DEFAULT_LOAD_ADDRESS: PhysicalAddress = PhysicalAddress::new(0x0001_0000);

/// GCW Zero
pub const fn gcw0() -> BoardConfig {
    BoardConfig {
        name: "gcw0",
        cpu_hz: 1_008_000_000,
        dcache_size: 16 * 1024,
        load_address: DEFAULT_LOAD_ADDRESS,
        variant: "gcw0",
        video: "",
        loglevel: "",
        mmc: Some(MmcSlot::vfat(0, "/dev/mmcblk0p1")),
        mmc_secondary: Some(MmcSlot::vfat(1, "/dev/mmcblk1p1")),
        nand: None,
        options: BootOptions::BACKLIGHT,
    }
}

/// RS-90
pub const fn rs90() -> BoardConfig {
    BoardConfig {
        name: "rs90",
        cpu_hz: 360_000_000,
        dcache_size: 16 * 1024,
        load_address: DEFAULT_LOAD_ADDRESS,
        variant: "rs90",
        video: "",
        loglevel: "",
        mmc: None,
        mmc_secondary: None,
        nand: Some(NandConfig {
            ubi: Some(UbiConfig {
                rootfs_volume: "rootfs",
                rootfs_mtd: Some("rootfs"),
            }),
        }),
        options: BootOptions::empty(),
    }
}

/// Dingoo A320
pub const fn a320() -> BoardConfig {
    BoardConfig {
        name: "a320",
        cpu_hz: 336_000_000,
        dcache_size: 16 * 1024,
        load_address: DEFAULT_LOAD_ADDRESS,
        variant: "a320",
        video: "",
        loglevel: "",
        mmc: Some(MmcSlot::vfat(0, "/dev/mmcblk0p1")),
        mmc_secondary: None,
        nand: Some(NandConfig {
            ubi: Some(UbiConfig {
                rootfs_volume: "rootfs",
                rootfs_mtd: None,
            }),
        }),
        options: BootOptions::empty(),
    }
}
