//! Calibrated busy-wait delay
//!
//! There is no timer interrupt and no scheduler; waiting means spinning a
//! countdown loop whose length is derived from the CPU clock. One iteration of
//! the MIPS loop (`bnez` + `addiu` in the delay slot) costs about five cycles.

use core::sync::atomic::{AtomicU32, Ordering};
use embedded_hal::delay::DelayNs;

/// Approximate CPU cycles per countdown iteration
pub const CYCLES_PER_LOOP: u32 = 5;

/// CPU clock used by the C-facing `udelay`, set once at startup
static CPU_HZ: AtomicU32 = AtomicU32::new(0);

/// Record the CPU clock for callers that have no [`BusyDelay`] at hand
pub fn calibrate(cpu_hz: u32) {
    CPU_HZ.store(cpu_hz, Ordering::Relaxed);
}

/// Number of countdown iterations for `us` microseconds at `cpu_hz`
pub const fn loop_count(cpu_hz: u32, us: u32) -> u32 {
    (cpu_hz / 1_000_000 / CYCLES_PER_LOOP).saturating_mul(us)
}

/// Spin for roughly `us` microseconds at `cpu_hz`
pub fn udelay(cpu_hz: u32, us: u32) {
    spin(loop_count(cpu_hz, us));
}

#[cfg(target_arch = "mips")]
fn spin(count: u32) {
    // SAFETY: the loop only decrements a scratch register.
    unsafe {
        core::arch::asm!(
            ".set noreorder",
            "1:",
            "bnez {0}, 1b",
            "addiu {0}, {0}, -1",
            ".set reorder",
            inout(reg) count => _,
            options(nomem, nostack),
        );
    }
}

#[cfg(not(target_arch = "mips"))]
fn spin(count: u32) {
    for _ in 0..count {
        core::hint::spin_loop();
    }
}

/// [`DelayNs`] provider backed by the countdown loop
#[derive(Debug, Clone, Copy)]
pub struct BusyDelay {
    cpu_hz: u32,
}

impl BusyDelay {
    /// Create a delay provider for a CPU running at `cpu_hz`
    pub const fn new(cpu_hz: u32) -> Self {
        Self { cpu_hz }
    }

    /// CPU clock this provider was calibrated for
    pub const fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }
}

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        udelay(self.cpu_hz, ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        udelay(self.cpu_hz, us);
    }
}

#[cfg(target_arch = "mips")]
mod c_abi {
    use core::ffi::c_uint;

    #[unsafe(no_mangle)]
    extern "C" fn udelay(us: c_uint) {
        super::udelay(super::CPU_HZ.load(super::Ordering::Relaxed), us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_count_scales_with_clock() {
        // 1008 MHz JZ4770: 1008 / 5 = 201 iterations per microsecond
        assert_eq!(loop_count(1_008_000_000, 1), 201);
        assert_eq!(loop_count(1_008_000_000, 10), 2_010);
        assert_eq!(loop_count(336_000_000, 1), 67);
    }

    #[test]
    fn loop_count_saturates_instead_of_wrapping() {
        assert_eq!(loop_count(1_008_000_000, u32::MAX), u32::MAX);
        assert_eq!(loop_count(1_000_000, 100), 0);
    }

    #[test]
    fn delay_ns_rounds_up_to_whole_microseconds() {
        let mut delay = BusyDelay::new(12_000_000);
        delay.delay_ns(1);
        delay.delay_us(3);
        delay.delay_ms(1);
        assert_eq!(delay.cpu_hz(), 12_000_000);
    }

    #[test]
    fn calibrate_records_clock() {
        calibrate(432_000_000);
        assert_eq!(CPU_HZ.load(Ordering::Relaxed), 432_000_000);
    }
}
