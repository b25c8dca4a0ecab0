//! UBIBoot Diagnostic Macros
//!
//! Serial output for the loader. `serial_puts!` is the always-on channel for
//! the handful of messages a user sees on the console; `debug_print!` is
//! verbose trace that disappears from release builds entirely.
//!
//! Both are fire-and-forget: formatting errors are discarded and never
//! influence control flow.

#![deny(missing_docs)]

/// Debug output levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum DebugLevel {
    /// Error messages - always shown
    Error = 0,
    /// Warning messages
    Warning = 1,
    /// Information messages
    Info = 2,
    /// Debug messages
    Debug = 3,
    /// Trace messages - most verbose
    Trace = 4,
}

impl DebugLevel {
    /// Short tag printed in front of each trace line
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Error => "E",
            Self::Warning => "W",
            Self::Info => "I",
            Self::Debug => "D",
            Self::Trace => "T",
        }
    }
}

/// Write formatted text to a [`Console`](crate::platform::Console)
#[macro_export]
macro_rules! serial_puts {
    ($console:expr, $($arg:tt)*) => {{
        use core::fmt::Write;
        let mut serial_writer = $crate::platform::SerialWriter::new($console);
        let _ = write!(serial_writer, $($arg)*);
    }};
}

/// Write a tagged trace line to a [`Console`](crate::platform::Console) in debug builds
///
/// Arguments are still type-checked in release builds; the output is
/// optimized away.
#[macro_export]
macro_rules! debug_print {
    ($console:expr, $level:expr, $($arg:tt)*) => {
        if cfg!(debug_assertions) {
            use core::fmt::Write;
            let level: $crate::macros::DebugLevel = $level;
            let mut debug_writer = $crate::platform::SerialWriter::new($console);
            let _ = write!(debug_writer, "[ubiboot:{}] ", level.tag());
            let _ = writeln!(debug_writer, $($arg)*);
        }
    };
}
