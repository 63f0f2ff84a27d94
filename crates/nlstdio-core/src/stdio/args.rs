//! Typed stand-in for a C variadic argument list.

use std::cell::Cell;
use std::ffi::CStr;

use super::printf::LengthMod;
use crate::error::{Result, StdioError};

/// One argument to a formatted write.
#[derive(Debug, Clone, Copy)]
pub enum FormatArg<'a> {
    Int(i64),
    Uint(u64),
    Float(f64),
    /// A narrow character for `%c`.
    Char(u8),
    /// A `wchar_t` for `%lc`.
    WideChar(u32),
    /// A C string for `%s`; `None` is a null pointer.
    Str(Option<&'a [u8]>),
    /// A wide string for `%ls`; `None` is a null pointer.
    WideStr(Option<&'a [u32]>),
    Pointer(usize),
    /// Target of `%n`.
    Count(&'a Cell<i64>),
}

macro_rules! from_int {
    ($variant:ident, $wide:ty: $($t:ty),*) => {
        $(impl From<$t> for FormatArg<'_> {
            fn from(v: $t) -> Self {
                Self::$variant(v as $wide)
            }
        })*
    };
}

from_int!(Int, i64: i8, i16, i32, i64, isize);
from_int!(Uint, u64: u8, u16, u32, u64, usize);

impl From<f32> for FormatArg<'_> {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for FormatArg<'_> {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<char> for FormatArg<'_> {
    fn from(c: char) -> Self {
        Self::WideChar(u32::from(c))
    }
}

impl<'a> From<&'a [u8]> for FormatArg<'a> {
    fn from(s: &'a [u8]) -> Self {
        Self::Str(Some(s))
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(s: &'a str) -> Self {
        Self::Str(Some(s.as_bytes()))
    }
}

impl<'a> From<&'a CStr> for FormatArg<'a> {
    fn from(s: &'a CStr) -> Self {
        Self::Str(Some(s.to_bytes()))
    }
}

impl<'a> From<&'a [u32]> for FormatArg<'a> {
    fn from(s: &'a [u32]) -> Self {
        Self::WideStr(Some(s))
    }
}

impl<'a> From<&'a Cell<i64>> for FormatArg<'a> {
    fn from(cell: &'a Cell<i64>) -> Self {
        Self::Count(cell)
    }
}

impl<T> From<*const T> for FormatArg<'_> {
    fn from(p: *const T) -> Self {
        Self::Pointer(p as usize)
    }
}

impl<T> From<*mut T> for FormatArg<'_> {
    fn from(p: *mut T) -> Self {
        Self::Pointer(p as usize)
    }
}

/// Narrow a signed value the way C promotes and truncates it.
#[must_use]
pub fn truncate_signed(raw: i64, length: LengthMod) -> i64 {
    match length {
        LengthMod::Hh => i64::from(raw as i8),
        LengthMod::H => i64::from(raw as i16),
        LengthMod::None => i64::from(raw as i32),
        _ => raw,
    }
}

#[must_use]
pub fn truncate_unsigned(raw: u64, length: LengthMod) -> u64 {
    match length {
        LengthMod::Hh => u64::from(raw as u8),
        LengthMod::H => u64::from(raw as u16),
        LengthMod::None => u64::from(raw as u32),
        _ => raw,
    }
}

/// Forward-only cursor over the arguments of one call.
///
/// Every accessor consumes exactly one argument. A missing argument or one
/// of an incompatible kind fails with [`StdioError::ArgumentMismatch`]
/// carrying its zero-based index.
#[derive(Debug)]
pub struct ArgCursor<'a, 'b> {
    args: &'b [FormatArg<'a>],
    next: usize,
}

impl<'a, 'b> ArgCursor<'a, 'b> {
    #[must_use]
    pub fn new(args: &'b [FormatArg<'a>]) -> Self {
        Self { args, next: 0 }
    }

    /// Index of the next argument to be consumed.
    #[must_use]
    pub fn position(&self) -> usize {
        self.next
    }

    fn take<T>(&mut self, pick: impl FnOnce(FormatArg<'a>) -> Option<T>) -> Result<T> {
        let index = self.next;
        let arg = *self
            .args
            .get(index)
            .ok_or(StdioError::ArgumentMismatch { index })?;
        self.next += 1;
        pick(arg).ok_or(StdioError::ArgumentMismatch { index })
    }

    /// An `int` for `*` width or precision.
    pub fn next_int(&mut self) -> Result<i32> {
        self.next_signed(LengthMod::None).map(|v| v as i32)
    }

    pub fn next_signed(&mut self, length: LengthMod) -> Result<i64> {
        self.take(|arg| match arg {
            FormatArg::Int(v) => Some(v),
            FormatArg::Uint(v) => Some(v as i64),
            FormatArg::Char(c) => Some(i64::from(c)),
            FormatArg::WideChar(c) => Some(i64::from(c)),
            _ => None,
        })
        .map(|raw| truncate_signed(raw, length))
    }

    pub fn next_unsigned(&mut self, length: LengthMod) -> Result<u64> {
        self.take(|arg| match arg {
            FormatArg::Int(v) => Some(v as u64),
            FormatArg::Uint(v) => Some(v),
            FormatArg::Char(c) => Some(u64::from(c)),
            FormatArg::WideChar(c) => Some(u64::from(c)),
            FormatArg::Pointer(p) => Some(p as u64),
            _ => None,
        })
        .map(|raw| truncate_unsigned(raw, length))
    }

    pub fn next_float(&mut self) -> Result<f64> {
        self.take(|arg| match arg {
            FormatArg::Float(v) => Some(v),
            _ => None,
        })
    }

    /// A `%c` argument, converted to `unsigned char`.
    pub fn next_char(&mut self) -> Result<u8> {
        self.take(|arg| match arg {
            FormatArg::Char(c) => Some(c),
            FormatArg::Int(v) => Some(v as u8),
            FormatArg::Uint(v) => Some(v as u8),
            FormatArg::WideChar(c) => Some(c as u8),
            _ => None,
        })
    }

    pub fn next_wide_char(&mut self) -> Result<u32> {
        self.take(|arg| match arg {
            FormatArg::WideChar(c) => Some(c),
            FormatArg::Char(c) => Some(u32::from(c)),
            FormatArg::Int(v) => Some(v as u32),
            FormatArg::Uint(v) => Some(v as u32),
            _ => None,
        })
    }

    pub fn next_str(&mut self) -> Result<Option<&'a [u8]>> {
        self.take(|arg| match arg {
            FormatArg::Str(s) => Some(s),
            _ => None,
        })
    }

    pub fn next_wide_str(&mut self) -> Result<Option<&'a [u32]>> {
        self.take(|arg| match arg {
            FormatArg::WideStr(s) => Some(s),
            _ => None,
        })
    }

    pub fn next_pointer(&mut self) -> Result<usize> {
        self.take(|arg| match arg {
            FormatArg::Pointer(p) => Some(p),
            FormatArg::Uint(v) => Some(v as usize),
            FormatArg::Int(v) => Some(v as usize),
            FormatArg::Str(s) => Some(s.map_or(0, |s| s.as_ptr() as usize)),
            FormatArg::WideStr(s) => Some(s.map_or(0, |s| s.as_ptr() as usize)),
            _ => None,
        })
    }

    pub fn next_count(&mut self) -> Result<&'a Cell<i64>> {
        self.take(|arg| match arg {
            FormatArg::Count(cell) => Some(cell),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_variants() {
        assert!(matches!(FormatArg::from(-3i32), FormatArg::Int(-3)));
        assert!(matches!(FormatArg::from(3u8), FormatArg::Uint(3)));
        assert!(matches!(FormatArg::from('é'), FormatArg::WideChar(0xE9)));
        assert!(matches!(FormatArg::from("hi"), FormatArg::Str(Some(b"hi"))));
        assert!(matches!(FormatArg::from(c"ok"), FormatArg::Str(Some(b"ok"))));
        assert!(matches!(FormatArg::from(std::ptr::null::<u8>()), FormatArg::Pointer(0)));
    }

    #[test]
    fn length_modifiers_truncate() {
        assert_eq!(truncate_signed(0x1_0000_00FF, LengthMod::None), 255);
        assert_eq!(truncate_signed(0xFF, LengthMod::Hh), -1);
        assert_eq!(truncate_signed(0x18000, LengthMod::H), -32768);
        assert_eq!(truncate_unsigned(u64::MAX, LengthMod::None), u64::from(u32::MAX));
        assert_eq!(truncate_unsigned(u64::MAX, LengthMod::Z), u64::MAX);
    }

    #[test]
    fn cursor_reports_mismatch_index() {
        let args = [FormatArg::from(1i32), FormatArg::from("s")];
        let mut cursor = ArgCursor::new(&args);
        assert_eq!(cursor.next_signed(LengthMod::None), Ok(1));
        assert_eq!(cursor.next_float(), Err(StdioError::ArgumentMismatch { index: 1 }));
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.next_int(), Err(StdioError::ArgumentMismatch { index: 2 }));
    }

    #[test]
    fn char_accepts_int_promotion() {
        let args = [FormatArg::from(0x141i32), FormatArg::Char(b'x')];
        let mut cursor = ArgCursor::new(&args);
        assert_eq!(cursor.next_char(), Ok(0x41));
        assert_eq!(cursor.next_wide_char(), Ok(u32::from(b'x')));
    }
}
