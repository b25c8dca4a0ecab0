//! Stack protector support
//!
//! The C drivers are built with `-fstack-protector`, so the image must provide
//! the guard value and the failure hook. A smashed stack is detected but not
//! acted upon: this early there is no console to report to and nothing to
//! unwind into.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Canary value installed at startup
pub const STACK_GUARD_MAGIC: usize = 0xBAAA_AAAD;

/// Stack canary read by instrumented C code
#[cfg_attr(target_arch = "mips", unsafe(export_name = "__stack_chk_guard"))]
pub static STACK_CHK_GUARD: AtomicUsize = AtomicUsize::new(0);

/// Install the canary; must run before any instrumented function
pub fn stack_chk_guard_setup() {
    STACK_CHK_GUARD.store(STACK_GUARD_MAGIC, Ordering::Relaxed);
}

/// Canary mismatch hook
///
/// Intentionally does nothing.
#[cfg_attr(target_arch = "mips", unsafe(export_name = "__stack_chk_fail"))]
pub extern "C" fn stack_chk_fail() {}
