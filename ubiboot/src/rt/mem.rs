//! Byte-wise memory primitives
//!
//! All loops go through volatile byte accesses so the optimizer cannot turn
//! them back into calls to `memcpy`/`memmove`, which on the bare-metal target
//! are these very functions.

#![warn(clippy::undocumented_unsafe_blocks)]

use core::cmp::Ordering;

/// Compare two NUL-terminated byte strings over at most `n` bytes
///
/// Bytes are compared unsigned. Returns 0 when the first `n` bytes match or
/// both strings end (NUL) at the same position, otherwise the difference of
/// the first mismatching pair.
///
/// # Safety
///
/// Both pointers must be readable up to the first NUL or `n` bytes,
/// whichever comes first.
pub unsafe fn compare_raw(s1: *const u8, s2: *const u8, n: usize) -> i32 {
    for offset in 0..n {
        // SAFETY: the caller guarantees readability up to the terminator or `n`,
        // and we stop at the first terminator below.
        let (c1, c2) = unsafe { (s1.add(offset).read(), s2.add(offset).read()) };
        if c1 != c2 {
            return i32::from(c1) - i32::from(c2);
        }
        if c1 == 0 {
            return 0;
        }
    }
    0
}

/// Slice form of [`compare_raw`]
///
/// The end of a slice reads as a NUL terminator, so `b"abc"` and `b"abc\0"`
/// compare equal.
pub fn compare(s1: &[u8], s2: &[u8], n: usize) -> i32 {
    for offset in 0..n {
        let c1 = s1.get(offset).copied().unwrap_or(0);
        let c2 = s2.get(offset).copied().unwrap_or(0);
        match c1.cmp(&c2) {
            Ordering::Equal if c1 == 0 => return 0,
            Ordering::Equal => {}
            _ => return i32::from(c1) - i32::from(c2),
        }
    }
    0
}

/// Copy `n` bytes forward from `src` to `dest`, returning `dest`
///
/// # Safety
///
/// Both ranges must be valid for `n` bytes. Overlap is only tolerated when
/// `dest` precedes `src`; [`move_bytes`] relies on that.
pub unsafe fn copy(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    for offset in 0..n {
        // SAFETY: the caller guarantees both ranges cover `offset < n`.
        unsafe {
            let byte = src.add(offset).read_volatile();
            dest.add(offset).write_volatile(byte);
        }
    }
    dest
}

/// Copy `n` bytes from `src` to `dest` with overlapping ranges allowed
///
/// Copies forward when `dest` does not lie inside `src..src + n`, backward
/// from the end otherwise. `n == 0` does nothing.
///
/// # Safety
///
/// Both ranges must be valid for `n` bytes.
pub unsafe fn move_bytes(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    let (d, s) = (dest as usize, src as usize);
    if d <= s || s.wrapping_add(n) <= d {
        // SAFETY: forward copying never reads a byte it already overwrote here.
        return unsafe { copy(dest, src, n) };
    }

    let mut remaining = n;
    while remaining > 0 {
        remaining -= 1;
        // SAFETY: `remaining < n` and the caller guarantees both ranges.
        unsafe {
            let byte = src.add(remaining).read_volatile();
            dest.add(remaining).write_volatile(byte);
        }
    }
    dest
}

/// Move `n` bytes inside `buf` from offset `src` to offset `dest`
///
/// Returns `false` without touching the buffer if either range falls outside it.
pub fn move_within(buf: &mut [u8], src: usize, dest: usize, n: usize) -> bool {
    let fits = |start: usize| start.checked_add(n).is_some_and(|end| end <= buf.len());
    if !fits(src) || !fits(dest) {
        return false;
    }

    let base = buf.as_mut_ptr();
    // SAFETY: both ranges were bounds-checked against `buf` above and the
    // exclusive borrow rules out any other access while we move.
    unsafe {
        move_bytes(base.add(dest), base.add(src), n);
    }
    true
}

/// libc entry points for the C drivers linked into the loader image
#[cfg(target_arch = "mips")]
mod c_abi {
    use core::ffi::{c_char, c_int, c_void};

    /// # Safety
    ///
    /// Same contract as C `strncmp`.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn strncmp(s1: *const c_char, s2: *const c_char, n: usize) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { super::compare_raw(s1.cast(), s2.cast(), n) }
    }

    /// # Safety
    ///
    /// Same contract as C `memcpy`.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn memcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
        // SAFETY: forwarded caller contract.
        unsafe { super::copy(dest.cast(), src.cast(), n).cast() }
    }

    /// # Safety
    ///
    /// Same contract as C `memmove`.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn memmove(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
        // SAFETY: forwarded caller contract.
        unsafe { super::move_bytes(dest.cast(), src.cast(), n).cast() }
    }
}
