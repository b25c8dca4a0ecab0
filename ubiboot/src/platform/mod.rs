//! Platform Abstraction Layer
//!
//! The loader's decisions are written against the [`Platform`] trait; the
//! hardware work happens behind it. Board bring-up, the SD/MMC and NAND
//! drivers and the UBI volume reader are external collaborators: the loader
//! only relies on their call contracts, never on how they work.
//!
//! # Platform Services
//!
//! - Board/SoC bring-up (clocks, pins, SDRAM controller)
//! - Serial console for diagnostics
//! - Boot mode keys sampled once each
//! - SD/MMC card init and kernel load
//! - NAND init and kernel load through UBI
//! - Optional: backlight control, boot benchmark tick counter
//!
//! # Supported Platforms
//!
//! - **Ingenic JZ47xx** (`jz47xx`, MIPS targets only): register-level console,
//!   GPIO keys and tick counter, C drivers for storage
//! - Scripted platforms in the test suites

#![deny(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]

use core::convert::Infallible;
use core::fmt;

use thiserror_no_std::Error;

use crate::config::MmcId;
use crate::memory::{VirtualAddress, WordMemory};

pub mod keys;
pub mod serial;

#[cfg(target_arch = "mips")]
pub mod jz47xx;

pub use keys::{GpioKeys, ModeKeys};
pub use serial::SerialWriter;

/// Storage driver failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No card or chip answered
    #[error("device not present")]
    NotPresent,
    /// The device answered but a transfer failed
    #[error("I/O error (code {0})")]
    Io(i32),
    /// The medium holds no kernel image
    #[error("no kernel image found")]
    NoImage,
    /// A kernel image was found but failed validation
    #[error("kernel image is invalid")]
    InvalidImage,
}

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Which of the two kernel images a driver loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    /// The regular kernel
    Primary,
    /// The backup kernel
    Alternate,
}

/// A kernel image placed in RAM, ready to be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelImage {
    /// Entry point
    pub entry: VirtualAddress,
    /// Image that was loaded
    pub variant: ImageVariant,
}

impl fmt::Display for KernelImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.variant {
            ImageVariant::Primary => "kernel",
            ImageVariant::Alternate => "backup kernel",
        };
        write!(f, "{kind} at {:#010x}", self.entry)
    }
}

/// Byte sink for the serial console
pub trait Console {
    /// Queue one byte, or report that the transmitter is busy
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Infallible>;
}

/// Board services the loader consumes
///
/// Every call blocks until the hardware is done. None of them has a timeout
/// on the loader side; if a driver needs one, it implements it itself.
pub trait Platform {
    /// Serial console
    type Console: Console;
    /// RAM access for the self-test
    type Memory: WordMemory;
    /// Boot mode keys
    type Keys: ModeKeys;

    /// Serial console
    fn console(&mut self) -> &mut Self::Console;

    /// RAM access
    fn memory(&mut self) -> &mut Self::Memory;

    /// Boot mode keys
    fn keys(&mut self) -> &mut Self::Keys;

    /// Clock, pin and SDRAM controller bring-up; cannot fail
    fn board_init(&mut self);

    /// Initialize the SD/MMC controller `id` and the card in it
    fn mmc_init(&mut self, id: MmcId) -> DriverResult<()>;

    /// Load a kernel from the card on `id` to `dest`
    ///
    /// With `alternate` set the driver may pick the backup image; the returned
    /// [`ImageVariant`] says which one it actually loaded.
    fn mmc_load_kernel(
        &mut self,
        id: MmcId,
        dest: VirtualAddress,
        alternate: bool,
    ) -> DriverResult<KernelImage>;

    /// Bring up the NAND controller; cannot fail
    fn nand_init(&mut self);

    /// Load the (backup, with `alternate`) kernel volume to `dest`, returning its entry point
    fn ubi_load_kernel(&mut self, dest: VirtualAddress, alternate: bool) -> DriverResult<VirtualAddress>;

    /// Switch the panel backlight
    fn set_backlight(&mut self, _on: bool) {}

    /// Reset and start the boot benchmark counter
    fn bench_start(&mut self) {}

    /// Stop the boot benchmark counter and read it
    fn bench_stop(&mut self) -> u64 {
        0
    }
}
