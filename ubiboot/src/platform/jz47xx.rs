//! Ingenic JZ47xx Platform Implementation
//!
//! Register-level pieces (UART, GPIO, operating system timer) live here;
//! board bring-up and the storage stack are C drivers linked into the same
//! image and reached through their C entry points.
//!
//! # Memory Map (KSEG1 views)
//!
//! ```text
//! 0xB0002000 - 0xB00020FF : TCU / OST
//! 0xB0010000 - 0xB00105FF : GPIO ports A-F (0x100 each)
//! 0xB0030000 - 0xB00300FF : UART0
//! ```

#![warn(clippy::undocumented_unsafe_blocks)]

use core::convert::Infallible;
use core::ffi::{c_int, c_void};
use core::ptr;

use embedded_hal::digital::{ErrorType, InputPin};

use super::{Console, DriverError, DriverResult, GpioKeys, ImageVariant, KernelImage, Platform};
use crate::config::MmcId;
use crate::memory::{VirtualAddress, VolatileMemory};

/// UART0 register block
pub const UART0_BASE: usize = 0xB003_0000;
const UART_THR: usize = 0x00;
const UART_LSR: usize = 0x14;
const UART_LSR_TDRQ: u32 = 1 << 5;

/// GPIO register block
pub const GPIO_BASE: usize = 0xB001_0000;
const GPIO_PORT_STRIDE: usize = 0x100;
const GPIO_PXPIN: usize = 0x00;

/// Timer/counter unit register block
pub const TCU_BASE: usize = 0xB000_2000;
const TCU_TESR: usize = 0x14;
const TCU_TECR: usize = 0x18;
const TCU_OSTCNTL: usize = 0xE4;
const TCU_OSTCNTH: usize = 0xE8;
const TCU_OSTCSR: usize = 0xEC;
const TCU_OSTCNTH_BUF: usize = 0xFC;
const OST_CHANNEL: u32 = 1 << 15;
const OSTCSR_EXT_EN: u32 = 1 << 2;
const OSTCSR_PRESCALE4: u32 = 1 << 3;
const OSTCSR_SD: u32 = 1 << 9;
const OSTCSR_CNT_MD: u32 = 1 << 15;

unsafe extern "C" {
    fn board_init();
    fn light(on: c_int);
    fn mmc_init(id: c_int) -> c_int;
    fn mmc_load_kernel(id: c_int, ld_addr: *mut c_void, alt: c_int, exec_addr: *mut *mut c_void) -> c_int;
    fn nand_init();
    fn ubi_load_kernel(ld_addr: *mut c_void, exec_addr: *mut *mut c_void, alt: c_int) -> c_int;
}

fn reg(base: usize, offset: usize) -> *mut u32 {
    (base + offset) as *mut u32
}

/// Polled UART console
pub struct Uart {
    base: usize,
}

impl Uart {
    /// UART0, already configured by the boot ROM / `board_init`
    pub const fn uart0() -> Self {
        Self { base: UART0_BASE }
    }
}

impl Console for Uart {
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        // SAFETY: UART0 registers are always mapped through KSEG1.
        unsafe {
            if reg(self.base, UART_LSR).read_volatile() & UART_LSR_TDRQ == 0 {
                return Err(nb::Error::WouldBlock);
            }
            reg(self.base, UART_THR).write_volatile(u32::from(byte));
        }
        Ok(())
    }
}

/// One GPIO line configured as input
#[derive(Debug, Clone, Copy)]
pub struct Pin {
    port: u8,
    line: u8,
}

impl Pin {
    /// Line `line` of port `port` (A = 0)
    pub const fn new(port: u8, line: u8) -> Self {
        Self { port, line }
    }

    fn level(&self) -> bool {
        let pins = reg(GPIO_BASE + usize::from(self.port) * GPIO_PORT_STRIDE, GPIO_PXPIN);
        // SAFETY: the pin-level register of ports A-F is read-only and always mapped.
        unsafe { pins.read_volatile() & (1 << self.line) != 0 }
    }
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// Mode key wiring of a board
#[derive(Debug, Clone, Copy)]
pub struct KeyPins {
    /// Backup kernel key
    pub alt: Pin,
    /// Backup rootfs key
    pub alt2: Pin,
    /// No-splash key
    pub alt3: Pin,
}

/// JZ47xx board
pub struct Jz47xx {
    console: Uart,
    memory: VolatileMemory,
    keys: GpioKeys<Pin, Pin, Pin>,
}

impl Jz47xx {
    /// Take over the SoC
    ///
    /// # Safety
    ///
    /// Must be created once, from the reset path, with the loader running
    /// out of cache and the kernel load area free for the RAM probe.
    pub unsafe fn new(keys: KeyPins) -> Self {
        Self {
            console: Uart::uart0(),
            // SAFETY: forwarded from this constructor's contract.
            memory: unsafe { VolatileMemory::new() },
            keys: GpioKeys::new(keys.alt, keys.alt2, keys.alt3),
        }
    }
}

impl Platform for Jz47xx {
    type Console = Uart;
    type Memory = VolatileMemory;
    type Keys = GpioKeys<Pin, Pin, Pin>;

    fn console(&mut self) -> &mut Self::Console {
        &mut self.console
    }

    fn memory(&mut self) -> &mut Self::Memory {
        &mut self.memory
    }

    fn keys(&mut self) -> &mut Self::Keys {
        &mut self.keys
    }

    fn board_init(&mut self) {
        // SAFETY: C bring-up routine with no preconditions beyond running first.
        unsafe { board_init() }
    }

    fn mmc_init(&mut self, id: MmcId) -> DriverResult<()> {
        // SAFETY: plain C call; the driver owns the controller state.
        match unsafe { mmc_init(c_int::from(id.0)) } {
            0 => Ok(()),
            _ => Err(DriverError::NotPresent),
        }
    }

    fn mmc_load_kernel(
        &mut self,
        id: MmcId,
        dest: VirtualAddress,
        alternate: bool,
    ) -> DriverResult<KernelImage> {
        let mut exec_addr: *mut c_void = ptr::null_mut();
        // SAFETY: `dest` is the uncached load window verified by the RAM test
        // and `exec_addr` outlives the call.
        let ret = unsafe {
            mmc_load_kernel(c_int::from(id.0), dest.as_mut_ptr(), c_int::from(alternate), &mut exec_addr)
        };
        let variant = match ret {
            0 => ImageVariant::Primary,
            1 => ImageVariant::Alternate,
            code => return Err(DriverError::Io(code)),
        };
        if exec_addr.is_null() {
            return Err(DriverError::NoImage);
        }
        Ok(KernelImage {
            entry: VirtualAddress::new(exec_addr as usize),
            variant,
        })
    }

    fn nand_init(&mut self) {
        // SAFETY: C NAND controller setup with no preconditions.
        unsafe { nand_init() }
    }

    fn ubi_load_kernel(&mut self, dest: VirtualAddress, alternate: bool) -> DriverResult<VirtualAddress> {
        let mut exec_addr: *mut c_void = ptr::null_mut();
        // SAFETY: as for `mmc_load_kernel`.
        let ret = unsafe { ubi_load_kernel(dest.as_mut_ptr(), &mut exec_addr, c_int::from(alternate)) };
        match ret {
            0 if !exec_addr.is_null() => Ok(VirtualAddress::new(exec_addr as usize)),
            0 => Err(DriverError::NoImage),
            code => Err(DriverError::Io(code)),
        }
    }

    fn set_backlight(&mut self, on: bool) {
        // SAFETY: C PWM helper with no preconditions.
        unsafe { light(c_int::from(on)) }
    }

    fn bench_start(&mut self) {
        // 3 MHz, 64-bit count, abrupt stop
        // SAFETY: TCU registers are always mapped; the OST is unused otherwise.
        unsafe {
            reg(TCU_BASE, TCU_OSTCSR)
                .write_volatile(OSTCSR_CNT_MD | OSTCSR_SD | OSTCSR_EXT_EN | OSTCSR_PRESCALE4);
            reg(TCU_BASE, TCU_TECR).write_volatile(OST_CHANNEL);
            reg(TCU_BASE, TCU_OSTCNTL).write_volatile(0);
            reg(TCU_BASE, TCU_OSTCNTH).write_volatile(0);
            reg(TCU_BASE, TCU_TESR).write_volatile(OST_CHANNEL);
        }
    }

    fn bench_stop(&mut self) -> u64 {
        // SAFETY: as above; reading OSTCNTL latches the high word into OSTCNTH_BUF.
        unsafe {
            reg(TCU_BASE, TCU_TECR).write_volatile(OST_CHANNEL);
            let low = reg(TCU_BASE, TCU_OSTCNTL).read_volatile();
            let high = reg(TCU_BASE, TCU_OSTCNTH_BUF).read_volatile();
            (u64::from(high) << 32) | u64::from(low)
        }
    }
}
