//! Freestanding Runtime Support
//!
//! There is no C library, no allocator and no OS underneath the loader. This
//! module supplies the small set of primitives the loader and the external C
//! drivers linked next to it rely on:
//!
//! - `mem`: bounded compare, forward copy and overlap-safe move
//! - `hex`: fixed-width hex digit writer for in-place token patching
//! - `delay`: calibrated busy-wait loop
//! - `bswap`: big-endian on-disk field conversion
//! - `stack_guard`: stack protector symbols (detection without recovery)
//! - `start`: BSS clearing for the reset path (MIPS only)
//!
//! On the MIPS target the C-facing entry points are exported under their
//! libc names; on a host they are ordinary Rust functions.

#![deny(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]

pub mod bswap;
pub mod delay;
pub mod hex;
pub mod mem;
pub mod stack_guard;

#[cfg(target_arch = "mips")]
pub mod start;

pub use bswap::{bswap32, bswap64};
pub use delay::{BusyDelay, udelay};
pub use hex::write_hex_digits;
pub use mem::{compare, copy, move_bytes, move_within};

/// Park the CPU for good
///
/// Used once a terminal decision has been made and there is nothing left to
/// return to.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
