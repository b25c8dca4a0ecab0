//! Kernel Parameter Table
//!
//! The argument vector handed to the kernel is a fixed list of slots in a
//! fixed order. Slots are overwritten in place as the boot path becomes known;
//! nothing is ever appended or removed.
//!
//! ```text
//! linux [ubi.mtd=] root= rootfstype= rootwait logo video quiet nocursor nocursor
//!   -- hwvariant= kernel_bak rootfs_bak [bootbench=]
//! ```
//!
//! Everything before `--` is parsed by the kernel; everything after it is
//! passed through to init. The separator slot has no setter.
//!
//! Every token is stored NUL-terminated so the table can be handed over as a
//! C `argv` without copying.

#![deny(missing_docs)]

use core::ffi::c_char;
use core::fmt::{self, Write};

use heapless::Vec;
use static_assertions::const_assert;
use thiserror_no_std::Error;

use crate::config::{BoardConfig, BootOptions, MmcSlot, UbiConfig};
use crate::rt::write_hex_digits;

/// Bytes available per token, terminator included
pub const TOKEN_CAPACITY: usize = 64;

/// Number of slot kinds, optional ones included
pub const MAX_PARAMS: usize = 15;

/// Token written by [`KernelParams::set_alt_kernel`]
pub const KERNEL_BAK: &str = "kernel_bak";

/// Token written by [`KernelParams::set_alt_rootfs`]
pub const ROOTFS_BAK: &str = "rootfs_bak";

/// Logo token when the splash screen is wanted
pub const LOGO_SPLASH: &str = "splash";

/// Logo token when the splash screen is suppressed
pub const LOGO_NONE: &str = "logo.nologo";

/// Argument separator between kernel and init arguments
pub const SEPARATOR: &str = "--";

const BOOTBENCH_TEMPLATE: &str = "bootbench=0x0000000000000000";
const BOOTBENCH_LAST_DIGIT: usize = BOOTBENCH_TEMPLATE.len() - 1;

/// Parameter slots in argument order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum Param {
    /// `argv[0]`
    Exec = 0,
    /// `ubi.mtd=`; only present when the rootfs lives on its own MTD
    UbiMtd,
    /// `root=`
    RootDev,
    /// `rootfstype=`
    RootType,
    /// `rootwait`
    RootWait,
    /// Splash screen selection
    Logo,
    /// `video=`
    Video,
    /// Kernel log verbosity
    Quiet,
    /// First cursor suppression flag
    NoCursor1,
    /// Second cursor suppression flag
    NoCursor2,
    /// `--`
    Separator,
    /// `hwvariant=`
    HwVariant,
    /// Set when a backup kernel was booted
    KernelBak,
    /// Set when the backup rootfs was requested
    RootfsBak,
    /// Boot time in SoC ticks; only present in benchmark builds
    BootBench,
}

const_assert!(Param::Exec as usize == 0);
const_assert!((Param::NoCursor2 as usize) < (Param::Separator as usize));
const_assert!((Param::Separator as usize) < (Param::HwVariant as usize));
const_assert!(Param::BootBench as usize == MAX_PARAMS - 1);
const_assert!(BOOTBENCH_TEMPLATE.len() < TOKEN_CAPACITY);

impl Param {
    /// All slots in argument order
    pub const ALL: [Self; MAX_PARAMS] = [
        Self::Exec,
        Self::UbiMtd,
        Self::RootDev,
        Self::RootType,
        Self::RootWait,
        Self::Logo,
        Self::Video,
        Self::Quiet,
        Self::NoCursor1,
        Self::NoCursor2,
        Self::Separator,
        Self::HwVariant,
        Self::KernelBak,
        Self::RootfsBak,
        Self::BootBench,
    ];

    /// Whether the kernel (rather than init) consumes this slot
    pub const fn is_kernel_arg(self) -> bool {
        (self as usize) < Self::Separator as usize
    }

    /// Slots whose content is fixed once the table is built
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Exec
                | Self::RootWait
                | Self::Video
                | Self::Quiet
                | Self::NoCursor1
                | Self::NoCursor2
                | Self::Separator
                | Self::HwVariant
        )
    }
}

/// Parameter table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    /// The text does not fit into a token
    #[error("token longer than {} bytes", TOKEN_CAPACITY - 1)]
    TooLong,
    /// Tokens are C strings and cannot contain NUL
    #[error("token contains a NUL byte")]
    InteriorNul,
    /// The slot is fixed at construction
    #[error("parameter {0:?} is read-only")]
    ReadOnly(Param),
    /// The slot is not part of this board's layout
    #[error("parameter {0:?} is not present")]
    Absent(Param),
}

/// One NUL-terminated command-line token
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Text followed by exactly one NUL
    bytes: Vec<u8, TOKEN_CAPACITY>,
}

impl Token {
    /// Empty token (`""`)
    pub fn empty() -> Self {
        let mut bytes = Vec::new();
        // Capacity is never zero
        let _ = bytes.push(0);
        Self { bytes }
    }

    /// Token holding `text`
    pub fn new(text: &str) -> Result<Self, ParamError> {
        let mut token = Self::empty();
        token.append(text)?;
        Ok(token)
    }

    fn append(&mut self, text: &str) -> Result<(), ParamError> {
        if text.as_bytes().contains(&0) {
            return Err(ParamError::InteriorNul);
        }
        if self.len() + text.len() + 1 > TOKEN_CAPACITY {
            return Err(ParamError::TooLong);
        }
        self.bytes.pop();
        self.bytes
            .extend_from_slice(text.as_bytes())
            .map_err(|_| ParamError::TooLong)?;
        self.bytes.push(0).map_err(|_| ParamError::TooLong)
    }

    fn clear(&mut self) {
        self.bytes.clear();
        let _ = self.bytes.push(0);
    }

    /// Text without the terminator
    pub fn as_str(&self) -> &str {
        let text = self.bytes.split_last().map_or(&[][..], |(_, text)| text);
        core::str::from_utf8(text).unwrap_or("")
    }

    /// Length of the text in bytes
    pub fn len(&self) -> usize {
        self.bytes.len().saturating_sub(1)
    }

    /// Whether the token is `""`
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer to the NUL-terminated text
    pub fn as_ptr(&self) -> *const c_char {
        self.bytes.as_ptr().cast()
    }
}

impl Write for Token {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s).map_err(|_| fmt::Error)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// The kernel argument table
#[derive(Clone, PartialEq, Eq)]
pub struct KernelParams {
    /// `None` marks a slot this board does not use
    slots: [Option<Token>; MAX_PARAMS],
}

impl KernelParams {
    /// Build the default table for `config`
    pub fn new(config: &BoardConfig) -> Result<Self, ParamError> {
        let mut slots: [Option<Token>; MAX_PARAMS] = [const { None }; MAX_PARAMS];
        for param in Param::ALL {
            let token = match param {
                Param::Exec => Some(Token::new("linux")?),
                Param::UbiMtd => config
                    .ubi()
                    .and_then(|ubi| ubi.rootfs_mtd)
                    .map(|_| Token::empty()),
                Param::RootWait => Some(Token::new("rootwait")?),
                Param::Video => Some(Token::new(config.video)?),
                Param::Quiet => Some(Token::new(config.loglevel)?),
                Param::NoCursor1 => Some(Token::new("vt.global_cursor_default=0")?),
                Param::NoCursor2 => Some(Token::new("vt.cur_default=1")?),
                Param::Separator => Some(Token::new(SEPARATOR)?),
                Param::HwVariant => {
                    let mut token = Token::empty();
                    write!(token, "hwvariant={}", config.variant).map_err(|_| ParamError::TooLong)?;
                    Some(token)
                }
                Param::BootBench => config
                    .options
                    .contains(BootOptions::BENCHMARK)
                    .then(|| Token::new(BOOTBENCH_TEMPLATE))
                    .transpose()?,
                Param::RootDev | Param::RootType | Param::Logo | Param::KernelBak | Param::RootfsBak => {
                    Some(Token::empty())
                }
            };
            if let Some(slot) = slots.get_mut(param as usize) {
                *slot = token;
            }
        }
        Ok(Self { slots })
    }

    /// Token in `param`, if the slot is part of the layout
    pub fn get(&self, param: Param) -> Option<&str> {
        self.token(param).map(Token::as_str)
    }

    fn token(&self, param: Param) -> Option<&Token> {
        self.slots.get(param as usize).and_then(Option::as_ref)
    }

    /// Whether the slot is part of this board's layout
    pub fn contains(&self, param: Param) -> bool {
        self.token(param).is_some()
    }

    /// Argument count handed to the kernel
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether the table has no slots at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present tokens in argument order
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.slots.iter().flatten()
    }

    /// Overwrite a patchable slot with formatted text
    pub fn set(&mut self, param: Param, args: fmt::Arguments<'_>) -> Result<(), ParamError> {
        if param.is_read_only() {
            return Err(ParamError::ReadOnly(param));
        }
        let token = self
            .slots
            .get_mut(param as usize)
            .and_then(Option::as_mut)
            .ok_or(ParamError::Absent(param))?;

        let mut staged = Token::empty();
        staged.write_fmt(args).map_err(|_| ParamError::TooLong)?;
        *token = staged;
        Ok(())
    }

    /// Mark that a backup kernel image was booted
    pub fn set_alt_kernel(&mut self) {
        // Always present and the literal always fits
        let _ = self.set(Param::KernelBak, format_args!("{KERNEL_BAK}"));
    }

    /// Ask userspace to mount the backup rootfs
    pub fn set_alt_rootfs(&mut self) {
        let _ = self.set(Param::RootfsBak, format_args!("{ROOTFS_BAK}"));
    }

    /// Select splash screen or no logo at all
    pub fn set_logo(&mut self, show_logo: bool) {
        let logo = if show_logo { LOGO_SPLASH } else { LOGO_NONE };
        let _ = self.set(Param::Logo, format_args!("{logo}"));
    }

    /// Point the kernel at the root filesystem on an SD/MMC card
    pub fn set_root_block(&mut self, slot: &MmcSlot) -> Result<(), ParamError> {
        self.set(Param::RootDev, format_args!("root={}", slot.root_device))?;
        self.set(Param::RootType, format_args!("rootfstype={}", slot.fs_type))
    }

    /// Point the kernel at the root filesystem in a UBI volume
    pub fn set_root_ubi(&mut self, ubi: &UbiConfig) -> Result<(), ParamError> {
        if let Some(mtd) = ubi.rootfs_mtd {
            self.set(Param::UbiMtd, format_args!("ubi.mtd={mtd}"))?;
        }
        self.set(Param::RootDev, format_args!("root=ubi0:{}", ubi.rootfs_volume))?;
        self.set(Param::RootType, format_args!("rootfstype=ubifs"))
    }

    /// Store a 64-bit tick count in the `bootbench=` slot
    ///
    /// The low word fills the last eight digits, the high word the eight
    /// before them. Does nothing when benchmarking is not configured.
    pub fn set_boot_bench(&mut self, ticks: u64) -> Result<(), ParamError> {
        if !self.contains(Param::BootBench) {
            return Ok(());
        }
        let mut field = [0u8; BOOTBENCH_TEMPLATE.len()];
        field.copy_from_slice(BOOTBENCH_TEMPLATE.as_bytes());
        write_hex_digits(ticks as u32, &mut field, BOOTBENCH_LAST_DIGIT);
        write_hex_digits((ticks >> 32) as u32, &mut field, BOOTBENCH_LAST_DIGIT - 8);

        let text = core::str::from_utf8(&field).map_err(|_| ParamError::TooLong)?;
        self.set(Param::BootBench, format_args!("{text}"))
    }

    /// Reset a patchable slot to `""`
    pub fn clear(&mut self, param: Param) -> Result<(), ParamError> {
        if param.is_read_only() {
            return Err(ParamError::ReadOnly(param));
        }
        self.slots
            .get_mut(param as usize)
            .and_then(Option::as_mut)
            .map(Token::clear)
            .ok_or(ParamError::Absent(param))
    }
}

/// Space-separated command line, empty tokens skipped
impl fmt::Display for KernelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in self.tokens().filter(|token| !token.is_empty()) {
            if !first {
                f.write_char(' ')?;
            }
            f.write_str(token.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for KernelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tokens()).finish()
    }
}
