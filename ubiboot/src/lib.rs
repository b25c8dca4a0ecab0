//! UBIBoot Loader Library
//!
//! Core loader functionality for Ingenic JZ47xx handhelds. The library holds
//! every decision the loader makes between reset and the jump into the kernel,
//! expressed against collaborator traits so it can be exercised on a host.
//!
//! # Architecture
//!
//! The loader is a single pass with branch points and no way back:
//! - Freestanding runtime primitives (`rt`) in place of a C library
//! - RAM self-test over an uncached window before any load (`memory`)
//! - A fixed-order kernel command line patched by boot outcome (`params`)
//! - Ordered storage fallback SD/MMC -> second card -> NAND/UBI (`boot`)
//! - Board bring-up and storage drivers behind the `platform` traits
//!
//! # Safety
//!
//! Raw memory access is confined to `rt`, `memory::VolatileMemory`, the
//! `jz47xx` register adapter and the final jump in `boot::handoff`. Every
//! unsafe block states the invariant it relies on.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "mips", feature(asm_experimental_arch))]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::panic)]
#![warn(clippy::unwrap_used)]

pub mod macros;

pub mod boot;
pub mod config;
pub mod memory;
pub mod params;
pub mod platform;
pub mod rt;

pub use boot::{BootLoader, BootOutcome, Handoff};
pub use config::BoardConfig;

use thiserror_no_std::Error;

/// Terminal loader failures
///
/// Every variant ends the boot attempt: the loader reports it on the serial
/// console and halts without transferring control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BootError {
    /// The RAM self-test read back a different pattern than it wrote
    #[error("SDRAM does not work")]
    RamTestFailed,
    /// Every configured storage backend failed to produce a kernel
    #[error("no bootable kernel found on any storage backend")]
    NoBootableKernel,
    /// NAND is configured without a filesystem the loader can read
    #[error("NAND configured without UBI, the only supported NAND filesystem")]
    UnsupportedNandFilesystem,
}

/// Result type for loader operations
pub type BootResult<T> = Result<T, BootError>;
