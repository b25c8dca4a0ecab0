//! SDRAM self-test
//!
//! Writes each word's byte offset into it across twice the data-cache size
//! starting at the kernel load address, then reads everything back. Covering
//! two cache sizes means the reads cannot all be satisfied by cache lines, so a
//! pass says something about the DRAM itself. The region is about to be
//! overwritten by the kernel anyway.

use static_assertions::const_assert;
use thiserror_no_std::Error;

use super::{KSEG_PHYS_MASK, PhysicalAddress, VirtualAddress, WordMemory};

/// Probe stride in bytes
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// How many data-cache sizes the probe spans
pub const CACHE_MULTIPLE: usize = 2;

const_assert!(WORD_SIZE == 4);
const_assert!(CACHE_MULTIPLE >= 2);

/// First mismatching word found by [`ProbeRegion::verify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("RAM mismatch at {addr:?}: wrote {expected:#010x}, read {found:#010x}")]
pub struct RamFault {
    /// Address of the bad word
    pub addr: VirtualAddress,
    /// Pattern written there
    pub expected: u32,
    /// Value read back
    pub found: u32,
}

/// Address range exercised by the self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRegion {
    base: VirtualAddress,
    len: usize,
}

impl ProbeRegion {
    /// Region of `CACHE_MULTIPLE * dcache_size` bytes at the uncached view of `load_address`
    ///
    /// `None` if the region does not end inside the 512 MiB KSEG1 window.
    pub const fn new(load_address: PhysicalAddress, dcache_size: usize) -> Option<Self> {
        let Some(len) = CACHE_MULTIPLE.checked_mul(dcache_size) else {
            return None;
        };
        let Some(end) = load_address.as_usize().checked_add(len) else {
            return None;
        };
        if end > KSEG_PHYS_MASK + 1 {
            return None;
        }
        Some(Self {
            base: load_address.kseg1(),
            len,
        })
    }

    /// First probed address
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    /// Probed length in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the region holds no words at all
    pub const fn is_empty(&self) -> bool {
        self.len < WORD_SIZE
    }

    /// Number of words probed
    pub const fn words(&self) -> usize {
        self.len / WORD_SIZE
    }

    fn offsets(&self) -> impl Iterator<Item = usize> {
        (0..self.len).step_by(WORD_SIZE).filter(|offset| offset + WORD_SIZE <= self.len)
    }

    /// Fill the region with its own byte offsets
    pub fn fill<M: WordMemory + ?Sized>(&self, mem: &mut M) {
        for offset in self.offsets() {
            mem.write_word(self.base.offset(offset), offset as u32);
        }
    }

    /// Check the pattern written by [`fill`](Self::fill)
    pub fn verify<M: WordMemory + ?Sized>(&self, mem: &mut M) -> Result<(), RamFault> {
        for offset in self.offsets() {
            let addr = self.base.offset(offset);
            let found = mem.read_word(addr);
            if found != offset as u32 {
                return Err(RamFault {
                    addr,
                    expected: offset as u32,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Run the full write-then-verify pass over `region`
pub fn ram_works<M: WordMemory + ?Sized>(mem: &mut M, region: &ProbeRegion) -> Result<(), RamFault> {
    region.fill(mem);
    region.verify(mem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    /// Memory that remembers writes and can be told to corrupt one address
    #[derive(Default)]
    struct ScriptedRam {
        cells: BTreeMap<usize, u32>,
        stuck: Option<(usize, u32)>,
        reads: BTreeSet<usize>,
    }

    impl WordMemory for ScriptedRam {
        fn write_word(&mut self, addr: VirtualAddress, value: u32) {
            self.cells.insert(addr.as_usize(), value);
        }

        fn read_word(&mut self, addr: VirtualAddress) -> u32 {
            self.reads.insert(addr.as_usize());
            match self.stuck {
                Some((stuck, value)) if stuck == addr.as_usize() => value,
                _ => self.cells.get(&addr.as_usize()).copied().unwrap_or(0xdead_beef),
            }
        }
    }

    const LOAD: PhysicalAddress = PhysicalAddress::new(0x0001_0000);

    #[test]
    fn region_spans_twice_the_dcache() {
        let region = ProbeRegion::new(LOAD, 16 * 1024).unwrap();
        assert_eq!(region.base().as_usize(), 0xA001_0000);
        assert_eq!(region.len(), 32 * 1024);
        assert_eq!(region.words(), 8 * 1024);
        assert!(!region.is_empty());
    }

    #[test]
    fn healthy_ram_passes() {
        let region = ProbeRegion::new(LOAD, 1024).unwrap();
        let mut ram = ScriptedRam::default();
        assert_eq!(ram_works(&mut ram, &region), Ok(()));
    }

    #[test]
    fn every_word_of_the_region_is_read_back() {
        let region = ProbeRegion::new(LOAD, 1024).unwrap();
        let mut ram = ScriptedRam::default();
        ram_works(&mut ram, &region).unwrap();

        assert_eq!(ram.cells.len(), region.words());
        assert_eq!(ram.reads.len(), region.words());
        let last = region.base().offset(region.len() - WORD_SIZE).as_usize();
        assert!(ram.reads.contains(&region.base().as_usize()));
        assert!(ram.reads.contains(&last));
        assert_eq!(ram.cells.get(&last), Some(&((region.len() - WORD_SIZE) as u32)));
    }

    #[test]
    fn single_bad_word_fails() {
        let region = ProbeRegion::new(LOAD, 1024).unwrap();
        // Last word of the second cache-sized half
        let bad = region.base().offset(2 * 1024 - WORD_SIZE);
        let mut ram = ScriptedRam {
            stuck: Some((bad.as_usize(), 0)),
            ..ScriptedRam::default()
        };

        let fault = ram_works(&mut ram, &region).unwrap_err();
        assert_eq!(fault.addr, bad);
        assert_eq!(fault.expected, (2 * 1024 - WORD_SIZE) as u32);
        assert_eq!(fault.found, 0);
    }

    #[test]
    fn corruption_beyond_one_cache_size_is_caught() {
        let region = ProbeRegion::new(LOAD, 1024).unwrap();
        let bad = region.base().offset(1024 + 64);
        let mut ram = ScriptedRam {
            stuck: Some((bad.as_usize(), 0xffff_ffff)),
            ..ScriptedRam::default()
        };
        assert!(ram_works(&mut ram, &region).is_err());
    }

    #[test]
    fn empty_region_trivially_passes() {
        let region = ProbeRegion::new(LOAD, 0).unwrap();
        let mut ram = ScriptedRam::default();
        assert!(region.is_empty());
        assert_eq!(ram_works(&mut ram, &region), Ok(()));
        assert!(ram.reads.is_empty());
    }

    #[test]
    fn oversized_cache_yields_no_region() {
        assert_eq!(ProbeRegion::new(LOAD, usize::MAX & !3), None);
        assert_eq!(ProbeRegion::new(LOAD, usize::MAX / CACHE_MULTIPLE + 1), None);
    }

    #[test]
    fn region_must_end_inside_kseg1() {
        let top = KSEG_PHYS_MASK + 1;
        let fits = ProbeRegion::new(PhysicalAddress::new(top - 2048), 1024).unwrap();
        assert_eq!(fits.base().offset(fits.len()).as_usize(), 0xA000_0000 + top);
        assert_eq!(ProbeRegion::new(PhysicalAddress::new(top - 2044), 1024), None);
        assert_eq!(ProbeRegion::new(PhysicalAddress::new(top + 4), 0), None);
    }
}
