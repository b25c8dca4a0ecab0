//! UBIBoot - reset entry
//!
//! The boot ROM copies the image to the start of KSEG0 and jumps to
//! `_start`, which sets the stack pointer and enters `ubiboot_main`. From
//! there the loader runs once: runtime setup, the orchestrator, then either
//! the jump into the kernel or a halt.
//!
//! Only meaningful on `mipsel-unknown-none`; built for any other target this
//! binary just says so.

#![cfg_attr(target_arch = "mips", no_std)]
#![cfg_attr(target_arch = "mips", no_main)]
#![cfg_attr(target_arch = "mips", feature(asm_experimental_arch))]

#[cfg(target_arch = "mips")]
mod entry {
    use core::panic::PanicInfo;

    use ubiboot::config::{BoardConfig, boards};
    use ubiboot::macros::DebugLevel;
    use ubiboot::platform::jz47xx::{Jz47xx, KeyPins, Pin, Uart};
    use ubiboot::rt::{self, delay, stack_guard, start};
    use ubiboot::{BootLoader, BootOutcome, debug_print, serial_puts};

    core::arch::global_asm!(
        ".section .text.start, \"ax\", @progbits",
        ".global _start",
        ".set noreorder",
        "_start:",
        "    la    $sp, _stack_top",
        "    la    $t9, ubiboot_main",
        "    jr    $t9",
        "    nop",
        ".set reorder",
    );

    #[cfg(feature = "board-rs90")]
    const BOARD: BoardConfig = boards::rs90();
    #[cfg(feature = "board-rs90")]
    const KEYS: KeyPins = KeyPins {
        alt: Pin::new(2, 10),
        alt2: Pin::new(2, 11),
        alt3: Pin::new(2, 12),
    };

    #[cfg(all(feature = "board-a320", not(feature = "board-rs90")))]
    const BOARD: BoardConfig = boards::a320();
    #[cfg(all(feature = "board-a320", not(feature = "board-rs90")))]
    const KEYS: KeyPins = KeyPins {
        alt: Pin::new(2, 17),
        alt2: Pin::new(3, 0),
        alt3: Pin::new(2, 16),
    };

    #[cfg(not(any(feature = "board-rs90", feature = "board-a320")))]
    const BOARD: BoardConfig = boards::gcw0();
    #[cfg(not(any(feature = "board-rs90", feature = "board-a320")))]
    const KEYS: KeyPins = KeyPins {
        alt: Pin::new(3, 18),
        alt2: Pin::new(4, 28),
        alt3: Pin::new(4, 27),
    };

    #[unsafe(no_mangle)]
    extern "C" fn ubiboot_main() -> ! {
        // SAFETY: first code after reset; nothing has touched `.bss` yet.
        unsafe { start::clear_bss() };
        stack_guard::stack_chk_guard_setup();
        delay::calibrate(BOARD.cpu_hz);

        // SAFETY: single instance, created on the reset path.
        let mut board = unsafe { Jz47xx::new(KEYS) };
        let loader = match BootLoader::new(BOARD, &mut board) {
            Ok(loader) => loader,
            Err(err) => {
                let mut uart = Uart::uart0();
                serial_puts!(&mut uart, "Bad board configuration: {}\n", err);
                rt::halt();
            }
        };

        match loader.run() {
            // SAFETY: the entry point was returned by the storage driver
            // after a complete load through KSEG1.
            BootOutcome::Transfer(handoff) => unsafe { handoff.execute() },
            BootOutcome::Halt(err) => {
                let mut uart = Uart::uart0();
                debug_print!(&mut uart, DebugLevel::Error, "{}", err);
                rt::halt()
            }
            BootOutcome::Stage1Complete => rt::halt(),
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        let mut uart = Uart::uart0();
        serial_puts!(&mut uart, "UBIBoot panic: {}\n", info.message());
        if let Some(location) = info.location() {
            serial_puts!(&mut uart, "  at {}:{}\n", location.file(), location.line());
        }
        rt::halt()
    }
}

#[cfg(not(target_arch = "mips"))]
fn main() {
    eprintln!("ubiboot runs on bare-metal JZ47xx only; build with `cargo build-loader`");
}
