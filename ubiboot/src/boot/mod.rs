//! Boot Orchestrator
//!
//! One pass from reset to the kernel, with branch points and no way back:
//!
//! ```text
//! INIT -> RAM_CHECK -> MODE_SELECT -> STORAGE_PROBE -> { MMC_PATH | NAND_PATH }
//!      -> PARAM_FINALIZE -> TRANSFER
//! ```
//!
//! A RAM self-test failure halts immediately. Storage failures move on to the
//! next backend in fixed order (primary card, secondary card, NAND/UBI) and
//! halt once that order is exhausted. Nothing is retried.
//!
//! The orchestrator never jumps. It returns a [`BootOutcome`]; the reset path
//! in the binary performs the transfer through [`Handoff::execute`].
//!
//! No cache maintenance happens before the transfer: kernels are loaded
//! through the uncached KSEG1 window, so no dirty line can shadow the image.
//! Loading through KSEG0 would require a write-back and invalidate first.

#![deny(missing_docs)]

use core::fmt;

use bitflags::bitflags;

use crate::config::{BoardConfig, BootOptions, ConfigError, MmcId, StorageBackends};
use crate::macros::DebugLevel;
use crate::memory::{ProbeRegion, VirtualAddress, ram_works};
use crate::params::{KernelParams, ParamError};
use crate::platform::{ImageVariant, ModeKeys, Platform};
use crate::{BootError, BootResult, debug_print, serial_puts};

pub mod handoff;

pub use handoff::{ArgVector, Handoff, KernelEntry};

/// Startup banner
pub const BANNER: &str = "UBIBoot by Paul Cercueil <paul@crapouillou.net>\n";

/// Orchestrator stages, in the only order they can be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    /// Board bring-up
    Init,
    /// RAM self-test
    RamCheck,
    /// Sampling the backup kernel key
    ModeSelect,
    /// Choosing a storage backend
    StorageProbe,
    /// Loading from SD/MMC
    MmcPath,
    /// Loading from NAND through UBI
    NandPath,
    /// Patching the late parameters
    ParamFinalize,
    /// Kernel ready to be entered
    Transfer,
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "INIT",
            Self::RamCheck => "RAM_CHECK",
            Self::ModeSelect => "MODE_SELECT",
            Self::StorageProbe => "STORAGE_PROBE",
            Self::MmcPath => "MMC_PATH",
            Self::NandPath => "NAND_PATH",
            Self::ParamFinalize => "PARAM_FINALIZE",
            Self::Transfer => "TRANSFER",
        })
    }
}

bitflags! {
    /// Mode keys that were held at boot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BootModes: u8 {
        /// Backup kernel requested
        const ALT_KERNEL = 1 << 0;
        /// Backup rootfs requested
        const ALT_ROOTFS = 1 << 1;
        /// Splash screen suppressed
        const NO_SPLASH = 1 << 2;
    }
}

/// Backend the kernel came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    /// SD/MMC card on the given controller
    Mmc(MmcId),
    /// UBI volume on NAND
    Nand,
}

impl fmt::Display for BootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mmc(id) => write!(f, "mmc{}", id.0),
            Self::Nand => f.write_str("nand"),
        }
    }
}

/// How a boot attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// A kernel is loaded; enter it
    Transfer(Handoff),
    /// Terminal failure, reported on the console already
    Halt(BootError),
    /// First-stage-only image finished its work
    Stage1Complete,
}

impl BootOutcome {
    /// Handoff, if a kernel was loaded
    pub fn handoff(&self) -> Option<&Handoff> {
        match self {
            Self::Transfer(handoff) => Some(handoff),
            _ => None,
        }
    }

    /// Terminal error, if the attempt halted
    pub fn error(&self) -> Option<BootError> {
        match self {
            Self::Halt(err) => Some(*err),
            _ => None,
        }
    }
}

/// Single-use boot context
///
/// Owns the parameter table and the mode flags for the duration of one boot
/// attempt and borrows the platform, so the caller gets it back afterwards.
pub struct BootLoader<'p, P: Platform> {
    config: BoardConfig,
    platform: &'p mut P,
    params: KernelParams,
    stage: BootStage,
    modes: BootModes,
}

impl<'p, P: Platform> BootLoader<'p, P> {
    /// Validate `config` and build the default parameter table
    pub fn new(config: BoardConfig, platform: &'p mut P) -> Result<Self, ConfigError> {
        config.validate()?;
        let params = KernelParams::new(&config)?;
        Ok(Self {
            config,
            platform,
            params,
            stage: BootStage::Init,
            modes: BootModes::empty(),
        })
    }

    /// Current stage
    pub fn stage(&self) -> BootStage {
        self.stage
    }

    /// Parameter table as patched so far
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Run the boot sequence to its end
    pub fn run(mut self) -> BootOutcome {
        let benchmark = self.config.options.contains(BootOptions::BENCHMARK);
        if benchmark {
            self.platform.bench_start();
        }
        self.platform.board_init();

        self.enter(BootStage::RamCheck);
        // `BoardConfig::validate` already checked that the region fits KSEG1
        let Some(region) = ProbeRegion::new(self.config.load_address, self.config.dcache_size) else {
            return self.halt(BootError::RamTestFailed);
        };
        if let Err(fault) = ram_works(self.platform.memory(), &region) {
            debug_print!(self.platform.console(), DebugLevel::Error, "{}", fault);
            serial_puts!(self.platform.console(), "SDRAM does not work!\n");
            return self.halt(BootError::RamTestFailed);
        }

        serial_puts!(self.platform.console(), "{}", BANNER);
        if self.config.options.contains(BootOptions::BACKLIGHT) {
            self.platform.set_backlight(true);
        }
        if self.config.options.contains(BootOptions::STAGE1_ONLY) {
            debug_print!(self.platform.console(), DebugLevel::Info, "stage 1 done");
            return BootOutcome::Stage1Complete;
        }

        self.enter(BootStage::ModeSelect);
        let alt = self.platform.keys().alt_key_pressed();
        self.modes.set(BootModes::ALT_KERNEL, alt);

        self.enter(BootStage::StorageProbe);
        let backends = self.config.backends();
        debug_print!(self.platform.console(), DebugLevel::Debug, "backends: {:?}", backends);
        let (entry, source) = match self.load_from_mmc(backends, alt) {
            Some(loaded) => loaded,
            None => {
                let has_nand = backends.contains(StorageBackends::NAND);
                if backends.contains(StorageBackends::MMC) {
                    let fallback = if has_nand { " Falling back to NAND." } else { "" };
                    serial_puts!(self.platform.console(), "Unable to boot from SD.{}\n", fallback);
                }
                if !has_nand {
                    return self.halt(BootError::NoBootableKernel);
                }
                match self.load_from_nand(backends, alt) {
                    Ok(loaded) => loaded,
                    Err(err) => return self.halt(err),
                }
            }
        };

        self.enter(BootStage::ParamFinalize);
        if benchmark {
            let ticks = self.platform.bench_stop();
            let patched = self.params.set_boot_bench(ticks);
            self.check_patch(patched);
        }

        let keys = self.platform.keys();
        let alt_rootfs = keys.alt2_key_pressed();
        let no_splash = keys.alt3_key_pressed();
        self.modes.set(BootModes::ALT_ROOTFS, alt_rootfs);
        self.modes.set(BootModes::NO_SPLASH, no_splash);
        if alt_rootfs {
            self.params.set_alt_rootfs();
        }
        self.params.set_logo(!no_splash);

        serial_puts!(self.platform.console(), "Kernel loaded. Executing...\n\n");
        self.enter(BootStage::Transfer);
        debug_print!(self.platform.console(), DebugLevel::Debug, "{} @ {:?}: {}", source, entry, self.params);

        BootOutcome::Transfer(Handoff::new(entry, self.params, self.modes, source))
    }

    /// Primary card, then the secondary one if the primary does not initialize
    fn load_from_mmc(&mut self, backends: StorageBackends, alt: bool) -> Option<(VirtualAddress, BootSource)> {
        if !backends.contains(StorageBackends::MMC) {
            return None;
        }
        let primary = self.config.mmc?;
        self.enter(BootStage::MmcPath);

        let slot = match self.platform.mmc_init(primary.id) {
            Ok(()) => primary,
            Err(err) => {
                debug_print!(self.platform.console(), DebugLevel::Warning, "mmc{}: {}", primary.id.0, err);
                if !backends.contains(StorageBackends::MMC_SECONDARY) {
                    return None;
                }
                let secondary = self.config.mmc_secondary?;
                if let Err(err) = self.platform.mmc_init(secondary.id) {
                    debug_print!(self.platform.console(), DebugLevel::Warning, "mmc{}: {}", secondary.id.0, err);
                    return None;
                }
                secondary
            }
        };

        let dest = self.config.load_address.kseg1();
        let image = match self.platform.mmc_load_kernel(slot.id, dest, alt) {
            Ok(image) => image,
            Err(err) => {
                debug_print!(self.platform.console(), DebugLevel::Warning, "mmc{}: {}", slot.id.0, err);
                return None;
            }
        };
        debug_print!(self.platform.console(), DebugLevel::Info, "mmc{}: {}", slot.id.0, image);

        if image.variant == ImageVariant::Alternate {
            self.params.set_alt_kernel();
        }
        let patched = self.params.set_root_block(&slot);
        self.check_patch(patched);
        Some((image.entry, BootSource::Mmc(slot.id)))
    }

    fn load_from_nand(&mut self, backends: StorageBackends, alt: bool) -> BootResult<(VirtualAddress, BootSource)> {
        self.enter(BootStage::NandPath);
        self.platform.nand_init();

        let ubi = match self.config.ubi() {
            Some(ubi) if backends.contains(StorageBackends::UBI) => Some(*ubi),
            _ => None,
        };
        let Some(ubi) = ubi else {
            serial_puts!(self.platform.console(), "No UBI layout on NAND, cannot boot from it.\n");
            return Err(BootError::UnsupportedNandFilesystem);
        };

        let dest = self.config.load_address.kseg1();
        match self.platform.ubi_load_kernel(dest, alt) {
            Ok(entry) => {
                debug_print!(self.platform.console(), DebugLevel::Info, "ubi: kernel at {:#010x}", entry);
                if alt {
                    self.params.set_alt_kernel();
                }
                let patched = self.params.set_root_ubi(&ubi);
                self.check_patch(patched);
                Ok((entry, BootSource::Nand))
            }
            Err(err) => {
                debug_print!(self.platform.console(), DebugLevel::Warning, "ubi: {}", err);
                serial_puts!(self.platform.console(), "Unable to boot from NAND.\n");
                Err(BootError::NoBootableKernel)
            }
        }
    }

    fn enter(&mut self, stage: BootStage) {
        debug_assert!(stage > self.stage, "{} after {}", stage, self.stage);
        self.stage = stage;
        debug_print!(self.platform.console(), DebugLevel::Trace, "-> {}", stage);
    }

    /// Patches are sized by `BoardConfig::validate`, so this only reports
    fn check_patch(&mut self, result: Result<(), ParamError>) {
        if let Err(err) = result {
            debug_print!(self.platform.console(), DebugLevel::Warning, "params: {}", err);
        }
    }

    fn halt(&mut self, err: BootError) -> BootOutcome {
        debug_print!(self.platform.console(), DebugLevel::Error, "halt in {}: {}", self.stage, err);
        BootOutcome::Halt(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::boards;
    use crate::memory::WordMemory;
    use crate::platform::{Console, DriverError, DriverResult, KernelImage};
    use core::convert::Infallible;
    use std::collections::BTreeMap;
    use std::vec::Vec;

    #[derive(Default)]
    struct Bench {
        out: Vec<u8>,
        ram: BTreeMap<usize, u32>,
        calls: Vec<&'static str>,
    }

    struct NoKeys;

    impl ModeKeys for NoKeys {
        fn alt_key_pressed(&mut self) -> bool {
            false
        }
        fn alt2_key_pressed(&mut self) -> bool {
            false
        }
        fn alt3_key_pressed(&mut self) -> bool {
            false
        }
    }

    struct Board {
        bench: Bench,
        keys: NoKeys,
    }

    impl Console for Bench {
        fn write_byte(&mut self, byte: u8) -> nb::Result<(), Infallible> {
            self.out.push(byte);
            Ok(())
        }
    }

    impl WordMemory for Bench {
        fn write_word(&mut self, addr: VirtualAddress, value: u32) {
            self.ram.insert(addr.as_usize(), value);
        }
        fn read_word(&mut self, addr: VirtualAddress) -> u32 {
            self.ram.get(&addr.as_usize()).copied().unwrap_or(0)
        }
    }

    impl Platform for Board {
        type Console = Bench;
        type Memory = Bench;
        type Keys = NoKeys;

        fn console(&mut self) -> &mut Bench {
            &mut self.bench
        }
        fn memory(&mut self) -> &mut Bench {
            &mut self.bench
        }
        fn keys(&mut self) -> &mut NoKeys {
            &mut self.keys
        }
        fn board_init(&mut self) {
            self.bench.calls.push("board_init");
        }
        fn mmc_init(&mut self, _id: MmcId) -> DriverResult<()> {
            self.bench.calls.push("mmc_init");
            Ok(())
        }
        fn mmc_load_kernel(&mut self, _id: MmcId, dest: VirtualAddress, _alt: bool) -> DriverResult<KernelImage> {
            self.bench.calls.push("mmc_load_kernel");
            Ok(KernelImage {
                entry: dest,
                variant: ImageVariant::Primary,
            })
        }
        fn nand_init(&mut self) {
            self.bench.calls.push("nand_init");
        }
        fn ubi_load_kernel(&mut self, _dest: VirtualAddress, _alt: bool) -> DriverResult<VirtualAddress> {
            Err(DriverError::NoImage)
        }
    }

    fn board() -> Board {
        Board {
            bench: Bench::default(),
            keys: NoKeys,
        }
    }

    #[test]
    fn invalid_config_never_reaches_the_hardware() {
        let mut board = board();
        let config = BoardConfig {
            dcache_size: 0,
            ..boards::a320()
        };
        assert_eq!(
            BootLoader::new(config, &mut board).err(),
            Some(ConfigError::InvalidCacheSize(0))
        );
        assert!(board.bench.calls.is_empty());
    }

    #[test]
    fn ram_test_outside_kseg1_is_rejected_up_front() {
        let mut board = board();
        let config = BoardConfig {
            dcache_size: usize::MAX & !3,
            ..boards::a320()
        };
        assert!(matches!(
            BootLoader::new(config, &mut board).err(),
            Some(ConfigError::RamTestOutOfRange { .. })
        ));
        assert!(board.bench.calls.is_empty());
        assert!(board.bench.ram.is_empty());
    }

    #[test]
    fn fresh_loader_starts_in_init_with_default_table() {
        let mut board = board();
        let config = boards::gcw0();
        let loader = BootLoader::new(config, &mut board).unwrap();
        assert_eq!(loader.stage(), BootStage::Init);
        assert_eq!(loader.params(), &KernelParams::new(&config).unwrap());
    }

    #[test]
    fn stage1_only_stops_after_banner() {
        let mut board = board();
        let config = BoardConfig {
            options: BootOptions::STAGE1_ONLY,
            ..boards::a320()
        };
        let outcome = BootLoader::new(config, &mut board).unwrap().run();
        assert_eq!(outcome, BootOutcome::Stage1Complete);
        assert_eq!(board.bench.calls, ["board_init"]);
        let out = String::from_utf8(board.bench.out).unwrap();
        assert!(out.contains("UBIBoot by Paul Cercueil"));
    }

    #[test]
    fn mmc_kernel_is_loaded_through_the_uncached_window() {
        let mut board = board();
        let outcome = BootLoader::new(boards::a320(), &mut board).unwrap().run();
        let handoff = outcome.handoff().unwrap();
        assert!(handoff.entry().is_uncached());
        assert_eq!(handoff.entry().physical(), boards::DEFAULT_LOAD_ADDRESS);
        assert_eq!(handoff.source(), BootSource::Mmc(MmcId(0)));
        assert_eq!(outcome.error(), None);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(BootStage::Init < BootStage::RamCheck);
        assert!(BootStage::MmcPath < BootStage::NandPath);
        assert!(BootStage::ParamFinalize < BootStage::Transfer);
        assert_eq!(BootStage::StorageProbe.to_string(), "STORAGE_PROBE");
        assert_eq!(BootSource::Mmc(MmcId(1)).to_string(), "mmc1");
        assert_eq!(BootSource::Nand.to_string(), "nand");
    }
}
