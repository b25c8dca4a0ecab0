//! Reset-path runtime initialization
//!
//! The reset stub in `main.rs` sets up the stack and calls into Rust before
//! anything has initialized `.bss`; it must be zeroed by hand first.

unsafe extern "C" {
    static mut _bss_start: u32;
    static mut _bss_end: u32;
}

/// Zero the `.bss` section word by word
///
/// # Safety
///
/// - Must run before any code reads a zero-initialized static.
/// - `_bss_start`/`_bss_end` must be word-aligned symbols from `link.ld`.
pub unsafe fn clear_bss() {
    // SAFETY: the linker script brackets `.bss` with these two symbols and
    // nothing else is running yet.
    unsafe {
        let mut ptr = core::ptr::addr_of_mut!(_bss_start);
        let end = core::ptr::addr_of_mut!(_bss_end);
        while ptr < end {
            ptr.write_volatile(0);
            ptr = ptr.add(1);
        }
    }
}
