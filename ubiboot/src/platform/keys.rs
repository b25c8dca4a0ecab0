//! Boot mode keys
//!
//! Three buttons held at power-on choose boot variants: the backup kernel,
//! the backup rootfs, and no splash screen. Each is sampled exactly once.

use embedded_hal::digital::InputPin;

/// Boot mode selectors
pub trait ModeKeys {
    /// Backup kernel requested
    fn alt_key_pressed(&mut self) -> bool;
    /// Backup rootfs requested
    fn alt2_key_pressed(&mut self) -> bool;
    /// Splash screen suppression requested
    fn alt3_key_pressed(&mut self) -> bool;
}

/// Mode keys on three active-low GPIO lines
///
/// A line that cannot be read counts as released, so a flaky pin never
/// selects a backup image on its own.
pub struct GpioKeys<A, B, C> {
    alt: A,
    alt2: B,
    alt3: C,
}

impl<A: InputPin, B: InputPin, C: InputPin> GpioKeys<A, B, C> {
    /// Keys on the given input pins
    pub const fn new(alt: A, alt2: B, alt3: C) -> Self {
        Self { alt, alt2, alt3 }
    }

    /// Give the pins back
    pub fn release(self) -> (A, B, C) {
        (self.alt, self.alt2, self.alt3)
    }
}

fn pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

impl<A: InputPin, B: InputPin, C: InputPin> ModeKeys for GpioKeys<A, B, C> {
    fn alt_key_pressed(&mut self) -> bool {
        pressed(&mut self.alt)
    }

    fn alt2_key_pressed(&mut self) -> bool {
        pressed(&mut self.alt2)
    }

    fn alt3_key_pressed(&mut self) -> bool {
        pressed(&mut self.alt3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level {
        High,
        Low,
        Broken,
    }

    struct Line(Level, u32);

    impl ErrorType for Line {
        type Error = ErrorKind;
    }

    impl InputPin for Line {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.is_low().map(|low| !low)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.1 += 1;
            match self.0 {
                Level::High => Ok(false),
                Level::Low => Ok(true),
                Level::Broken => Err(ErrorKind::Other),
            }
        }
    }

    #[test]
    fn low_line_means_pressed() {
        let mut keys = GpioKeys::new(
            Line(Level::Low, 0),
            Line(Level::High, 0),
            Line(Level::Low, 0),
        );
        assert!(keys.alt_key_pressed());
        assert!(!keys.alt2_key_pressed());
        assert!(keys.alt3_key_pressed());
    }

    #[test]
    fn unreadable_line_counts_as_released() {
        let mut keys = GpioKeys::new(
            Line(Level::Broken, 0),
            Line(Level::Broken, 0),
            Line(Level::Broken, 0),
        );
        assert!(!keys.alt_key_pressed());
        assert!(!keys.alt2_key_pressed());
        assert!(!keys.alt3_key_pressed());
    }

    #[test]
    fn each_sample_reads_its_own_line_once() {
        let mut keys = GpioKeys::new(
            Line(Level::High, 0),
            Line(Level::High, 0),
            Line(Level::High, 0),
        );
        keys.alt2_key_pressed();
        let (alt, alt2, alt3) = keys.release();
        assert_eq!((alt.1, alt2.1, alt3.1), (0, 1, 0));
    }
}
