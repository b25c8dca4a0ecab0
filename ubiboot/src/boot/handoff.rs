//! Control transfer to the loaded kernel
//!
//! The kernel is entered like a C `main`: `(argc, argv, envp, aux)`, with the
//! last two always null. `argv` points straight into the parameter table,
//! whose tokens are already NUL-terminated.

#![warn(clippy::undocumented_unsafe_blocks)]

use core::ffi::{c_char, c_int};
use core::ptr;

use heapless::Vec;

use super::{BootModes, BootSource};
use crate::memory::VirtualAddress;
use crate::params::{KernelParams, MAX_PARAMS};

/// Kernel entry point signature
pub type KernelEntry =
    unsafe extern "C" fn(c_int, *const *const c_char, *const *const c_char, *const c_int) -> !;

/// `argv` array: one pointer per token plus the terminating null
pub type ArgVector = Vec<*const c_char, { MAX_PARAMS + 1 }>;

/// A loaded kernel and the arguments it will receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    entry: VirtualAddress,
    params: KernelParams,
    modes: BootModes,
    source: BootSource,
}

impl Handoff {
    pub(crate) fn new(
        entry: VirtualAddress,
        params: KernelParams,
        modes: BootModes,
        source: BootSource,
    ) -> Self {
        Self {
            entry,
            params,
            modes,
            source,
        }
    }

    /// Kernel entry point
    pub fn entry(&self) -> VirtualAddress {
        self.entry
    }

    /// Final parameter table
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Mode keys held at boot
    pub fn modes(&self) -> BootModes {
        self.modes
    }

    /// Backend the kernel came from
    pub fn source(&self) -> BootSource {
        self.source
    }

    /// Argument count, empty tokens included
    pub fn argc(&self) -> c_int {
        self.params.len() as c_int
    }

    /// Null-terminated `argv`, valid while `self` is
    pub fn argv(&self) -> ArgVector {
        let mut argv = ArgVector::new();
        for token in self.params.tokens() {
            // Never more than MAX_PARAMS tokens
            let _ = argv.push(token.as_ptr());
        }
        let _ = argv.push(ptr::null());
        argv
    }

    /// Jump into the kernel
    ///
    /// # Safety
    ///
    /// The entry address must point at a complete kernel image loaded through
    /// the uncached window, and nothing may run after the loader.
    pub unsafe fn execute(self) -> ! {
        let argc = self.argc();
        let argv = self.argv();
        // SAFETY: the caller guarantees `entry` is the kernel's entry point;
        // function pointers and addresses have the same size on this target.
        let kernel = unsafe { core::mem::transmute::<usize, KernelEntry>(self.entry.as_usize()) };
        // SAFETY: `argv` and the tokens it points to live in this frame,
        // which is never popped.
        unsafe { kernel(argc, argv.as_ptr(), ptr::null(), ptr::null()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MmcId, boards};
    use core::ffi::CStr;

    fn handoff() -> Handoff {
        let board = boards::gcw0();
        let mut params = KernelParams::new(&board).unwrap();
        params.set_root_block(&board.mmc.unwrap()).unwrap();
        params.set_logo(true);
        Handoff::new(
            VirtualAddress::new(0x8001_0000),
            params,
            BootModes::empty(),
            BootSource::Mmc(MmcId(0)),
        )
    }

    #[test]
    fn argv_mirrors_the_table_and_ends_in_null() {
        let handoff = handoff();
        let argv = handoff.argv();
        assert_eq!(argv.len(), handoff.params().len() + 1);
        assert_eq!(handoff.argc() as usize, handoff.params().len());
        assert!(argv.last().unwrap().is_null());

        let texts: std::vec::Vec<&str> = argv[..argv.len() - 1]
            .iter()
            // SAFETY: every entry but the last points at a NUL-terminated token.
            .map(|&arg| unsafe { CStr::from_ptr(arg) }.to_str().unwrap())
            .collect();
        let expected: std::vec::Vec<&str> = handoff.params().tokens().map(|t| t.as_str()).collect();
        assert_eq!(texts, expected);
        assert_eq!(texts[0], "linux");
        assert_eq!(texts[1], "root=/dev/mmcblk0p1");
    }

    #[test]
    fn empty_slots_still_count() {
        let handoff = handoff();
        // kernel_bak and rootfs_bak stay empty on a plain boot
        assert_eq!(handoff.argc(), 13);
        let argv = handoff.argv();
        // SAFETY: index 11 is a token pointer.
        let kernel_bak = unsafe { CStr::from_ptr(argv[11]) };
        assert!(kernel_bak.to_bytes().is_empty());
    }

    #[test]
    fn full_table_fits_argv() {
        let board = crate::config::BoardConfig {
            options: crate::config::BootOptions::BENCHMARK,
            ..boards::rs90()
        };
        let handoff = Handoff::new(
            VirtualAddress::new(0x8001_0000),
            KernelParams::new(&board).unwrap(),
            BootModes::ALT_KERNEL,
            BootSource::Nand,
        );
        assert_eq!(handoff.argv().len(), MAX_PARAMS + 1);
        assert_eq!(handoff.modes(), BootModes::ALT_KERNEL);
        assert_eq!(handoff.source(), BootSource::Nand);
    }
}
