//! Memory Layout and Access
//!
//! Address types, the MIPS32 kernel-segment windows and word-level access to
//! RAM for the self-test.
//!
//! # Memory Layout
//!
//! ```text
//! Virtual Address Space (MIPS32, kernel mode):
//! 0x80000000 - 0x9FFFFFFF : KSEG0 - cached, unmapped window onto physical 0..512MB
//! 0xA0000000 - 0xBFFFFFFF : KSEG1 - uncached, unmapped window onto the same RAM
//! ```
//!
//! The loader itself runs out of the data cache (the boot ROM placed it
//! there), so every kernel load and the RAM probe go through KSEG1. Writes
//! never allocate cache lines and never evict the lines holding the loader.
//! That is also why no cache flush is needed before jumping into the kernel.

#![deny(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]

use core::fmt;

pub mod ramtest;

pub use ramtest::{ProbeRegion, ram_works};

/// Base of the cached kernel segment
pub const KSEG0: usize = 0x8000_0000;

/// Base of the uncached kernel segment
pub const KSEG1: usize = 0xA000_0000;

/// Mask selecting the physical part of a KSEG0/KSEG1 address
pub const KSEG_PHYS_MASK: usize = 0x1FFF_FFFF;

/// Physical memory address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysicalAddress(usize);

impl PhysicalAddress {
    /// Create a physical address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Cached (KSEG0) view of this address
    pub const fn kseg0(self) -> VirtualAddress {
        VirtualAddress(KSEG0 | (self.0 & KSEG_PHYS_MASK))
    }

    /// Uncached (KSEG1) view of this address
    pub const fn kseg1(self) -> VirtualAddress {
        VirtualAddress(KSEG1 | (self.0 & KSEG_PHYS_MASK))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA({:#010x})", self.0)
    }
}

/// Virtual (KSEG-mapped) address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtualAddress(usize);

impl VirtualAddress {
    /// Create a virtual address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Address `offset` bytes further on
    pub const fn offset(self, offset: usize) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Whether this address lies in the uncached window
    pub const fn is_uncached(self) -> bool {
        self.0 & !KSEG_PHYS_MASK == KSEG1
    }

    /// Physical address behind a KSEG0/KSEG1 address
    pub const fn physical(self) -> PhysicalAddress {
        PhysicalAddress(self.0 & KSEG_PHYS_MASK)
    }

    /// Raw pointer to this address
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#010x})", self.0)
    }
}

impl fmt::LowerHex for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// 32-bit word access to RAM
///
/// Implemented with volatile accesses on hardware and with plain storage in
/// tests, so the self-test can be driven against a scripted memory.
pub trait WordMemory {
    /// Store `value` at the word-aligned address `addr`
    fn write_word(&mut self, addr: VirtualAddress, value: u32);

    /// Load the word at the word-aligned address `addr`
    fn read_word(&mut self, addr: VirtualAddress) -> u32;
}

/// Direct volatile access to the address space
pub struct VolatileMemory {
    _private: (),
}

impl VolatileMemory {
    /// Create a handle for raw RAM access
    ///
    /// # Safety
    ///
    /// Every address later passed to the handle must be mapped, word-aligned
    /// RAM that nothing else relies on while it is being written.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl WordMemory for VolatileMemory {
    fn write_word(&mut self, addr: VirtualAddress, value: u32) {
        // SAFETY: guaranteed by the contract of `VolatileMemory::new`.
        unsafe { addr.as_mut_ptr::<u32>().write_volatile(value) }
    }

    fn read_word(&mut self, addr: VirtualAddress) -> u32 {
        // SAFETY: guaranteed by the contract of `VolatileMemory::new`.
        unsafe { addr.as_mut_ptr::<u32>().read_volatile() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kseg_windows_share_physical_address() {
        let pa = PhysicalAddress::new(0x0001_0000);
        assert_eq!(pa.kseg0().as_usize(), 0x8001_0000);
        assert_eq!(pa.kseg1().as_usize(), 0xA001_0000);
        assert_eq!(pa.kseg1().physical(), pa);
        assert_eq!(pa.kseg0().physical(), pa);
    }

    #[test]
    fn only_kseg1_is_uncached() {
        let pa = PhysicalAddress::new(0x0040_0000);
        assert!(pa.kseg1().is_uncached());
        assert!(!pa.kseg0().is_uncached());
        assert!(!VirtualAddress::new(0x0040_0000).is_uncached());
    }

    #[test]
    fn debug_output_is_hex() {
        let va = PhysicalAddress::new(0x10000).kseg1();
        assert_eq!(format!("{va:?}"), "VA(0xa0010000)");
        assert_eq!(format!("{:x}", va), "a0010000");
    }
}
