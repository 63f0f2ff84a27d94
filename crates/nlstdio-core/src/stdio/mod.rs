//! Bounded formatted output: the printf family over pluggable sinks.
//!
//! Every variant runs the same [`writer::format`] core and differs only in
//! the sink it writes to and whether floating-point conversions are
//! expanded. The `i`-prefixed variants are the integer-only writer.
//!
//! Format strings are byte strings and end at their first NUL.

pub mod args;
pub mod float;
pub mod printf;
pub mod sink;
pub mod writer;

pub use args::{ArgCursor, FormatArg};
pub use sink::{Descriptor, FixedBuffer, GrowableBuffer, IoWrite, OutputSink, RawFd, RawWrite};
pub use writer::{FloatSupport, FormatOptions};

use crate::error::Result;

/// `vfprintf` over any sink with explicit options.
pub fn vformat<S: OutputSink + ?Sized>(
    sink: &mut S,
    options: &FormatOptions,
    fmt: &[u8],
    args: &[FormatArg<'_>],
) -> Result<usize> {
    writer::format(sink, options, fmt, args)
}

fn to_fixed(buf: &mut [u8], options: &FormatOptions, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    vformat(&mut FixedBuffer::new(buf), options, fmt, args)
}

fn to_growable(options: &FormatOptions, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<Vec<u8>> {
    let mut sink = GrowableBuffer::new();
    vformat(&mut sink, options, fmt, args)?;
    Ok(sink.into_bytes())
}

/// Format into `buf`, truncating to `buf.len() - 1` bytes plus a NUL.
///
/// Returns the untruncated length.
pub fn snprintf(buf: &mut [u8], fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    to_fixed(buf, &FormatOptions::full(), fmt, args)
}

pub fn sniprintf(buf: &mut [u8], fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    to_fixed(buf, &FormatOptions::integer_only(), fmt, args)
}

/// Format into a freshly allocated buffer. The returned bytes exclude the
/// terminator.
pub fn asprintf(fmt: &[u8], args: &[FormatArg<'_>]) -> Result<Vec<u8>> {
    to_growable(&FormatOptions::full(), fmt, args)
}

pub fn asiprintf(fmt: &[u8], args: &[FormatArg<'_>]) -> Result<Vec<u8>> {
    to_growable(&FormatOptions::integer_only(), fmt, args)
}

/// Format to a file descriptor with `write(2)`.
pub fn dprintf(fd: libc::c_int, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    vformat(&mut Descriptor::new(RawFd(fd)), &FormatOptions::full(), fmt, args)
}

pub fn diprintf(fd: libc::c_int, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    vformat(&mut Descriptor::new(RawFd(fd)), &FormatOptions::integer_only(), fmt, args)
}

/// Format to any [`std::io::Write`].
pub fn fprintf<W: std::io::Write>(out: &mut W, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    vformat(&mut Descriptor::new(IoWrite(out)), &FormatOptions::full(), fmt, args)
}

pub fn fiprintf<W: std::io::Write>(out: &mut W, fmt: &[u8], args: &[FormatArg<'_>]) -> Result<usize> {
    vformat(&mut Descriptor::new(IoWrite(out)), &FormatOptions::integer_only(), fmt, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StdioError;
    use crate::locale::{self, Encoding, Locale};
    use proptest::prelude::*;

    #[test]
    fn snprintf_fits_and_terminates() {
        let mut buf = [0xAAu8; 10];
        assert_eq!(snprintf(&mut buf, b"%d", &[42i32.into()]), Ok(2));
        assert_eq!(&buf[..3], b"42\0");
        assert_eq!(buf[3], 0xAA);
    }

    #[test]
    fn snprintf_zero_capacity_reports_length() {
        let mut buf: [u8; 0] = [];
        assert_eq!(snprintf(&mut buf, b"hello %s", &["world".into()]), Ok(11));
    }

    #[test]
    fn snprintf_capacity_one_stores_only_terminator() {
        let mut buf = [0xAAu8; 1];
        assert_eq!(snprintf(&mut buf, b"abc", &[]), Ok(3));
        assert_eq!(buf, [0]);
    }

    #[test]
    fn sniprintf_passes_every_float_conversion_through() {
        let mut buf = [0u8; 16];
        assert_eq!(sniprintf(&mut buf, b"%f%g%G%e%F", &[1.5f64.into()]), Ok(5));
        assert_eq!(&buf[..6], b"fgGeF\0");
    }

    #[test]
    fn asprintf_returns_content() {
        assert_eq!(asprintf(b"%s-%03d", &["id".into(), 7i32.into()]).as_deref(), Ok(&b"id-007"[..]));
        assert_eq!(asiprintf(b"%.1f", &[]).as_deref(), Ok(&b"f"[..]));
    }

    #[test]
    fn fprintf_writes_through_io() {
        let mut out = Vec::new();
        assert_eq!(fprintf(&mut out, b"%5.1f|%x", &[2.3f64.into(), 255u32.into()]), Ok(8));
        assert_eq!(out, b"  2.3|ff");
        let mut out = Vec::new();
        assert_eq!(fiprintf(&mut out, b"%e", &[]), Ok(1));
        assert_eq!(out, b"e");
    }

    #[test]
    fn dprintf_to_bad_descriptor_fails() {
        assert!(matches!(
            dprintf(-1, b"x", &[]),
            Err(StdioError::OutputError { .. })
        ));
        assert!(matches!(diprintf(-1, b"x", &[]), Err(StdioError::OutputError { .. })));
    }

    #[test]
    fn wide_arguments_follow_thread_locale() {
        let utf8 = Locale::parse("C.UTF-8").expect("known charset");
        let previous = locale::use_thread_locale(Some(&utf8));
        let wide: Vec<u32> = "ñ".chars().map(u32::from).collect();
        let out = asprintf(b"%ls", &[wide.as_slice().into()]);
        locale::use_thread_locale(None);
        assert_eq!(out.as_deref(), Ok(&b"\xC3\xB1"[..]));
        assert_eq!(previous, None);

        locale::use_thread_locale(Some(&Locale::c()));
        assert_eq!(locale::current_encoding(), Encoding::Ascii);
        let ascii = asprintf(b"%ls", &[wide.as_slice().into()]);
        locale::use_thread_locale(None);
        assert_eq!(ascii, Err(StdioError::InvalidSequence));
    }

    proptest! {
        #[test]
        fn prop_fixed_buffer_stores_min_prefix(text in "[ -~]{0,64}", capacity in 1usize..48) {
            let mut buf = vec![0xAAu8; capacity];
            let n = snprintf(&mut buf, b"%s", &[text.as_str().into()]).expect("formats");
            prop_assert_eq!(n, text.len());
            let stored = text.len().min(capacity - 1);
            prop_assert_eq!(&buf[..stored], &text.as_bytes()[..stored]);
            prop_assert_eq!(buf[stored], 0);
        }
    }
}
