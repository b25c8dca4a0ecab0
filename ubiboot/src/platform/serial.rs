//! Formatted output over a [`Console`]

use core::fmt;

use super::Console;

/// `core::fmt::Write` adapter for a [`Console`]
///
/// Waits for the transmitter on every byte and expands `\n` to `\n\r` for
/// terminals that expect carriage returns.
pub struct SerialWriter<'a, C: Console + ?Sized> {
    console: &'a mut C,
}

impl<'a, C: Console + ?Sized> SerialWriter<'a, C> {
    /// Wrap `console`
    pub fn new(console: &'a mut C) -> Self {
        Self { console }
    }

    fn put(&mut self, byte: u8) {
        let _ = nb::block!(self.console.write_byte(byte));
    }
}

impl<C: Console + ?Sized> fmt::Write for SerialWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.put(byte);
            if byte == b'\n' {
                self.put(b'\r');
            }
        }
        Ok(())
    }
}
