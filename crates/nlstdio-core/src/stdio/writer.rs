//! The formatted-writer core shared by every printf variant.

use super::args::{ArgCursor, FormatArg, truncate_signed};
use super::float::format_float;
use super::printf::{
    FieldSink, FormatCursor, FormatSegment, FormatSpec, LengthMod, MAX_FIELD, Precision, Width,
    emit_padded, format_char, format_pointer, format_signed, format_str, format_unsigned,
};
use super::sink::OutputSink;
use crate::error::{Result, StdioError};
use crate::locale::{Encoding, current_encoding};
use crate::multibyte::{self, ConversionState, MB_LEN_MAX};

/// Whether floating-point conversions are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatSupport {
    #[default]
    Full,
    /// The `i` variants (`sniprintf`, `diprintf`, ...). Floating-point
    /// conversions are passed through like unknown ones.
    IntegerOnly,
}

/// Selects the writer variant for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub floats: FloatSupport,
    /// Encoding used to turn `%lc` and `%ls` arguments into bytes.
    pub encoding: Encoding,
}

impl FormatOptions {
    /// Full writer in the calling thread's current encoding.
    #[must_use]
    pub fn full() -> Self {
        Self {
            floats: FloatSupport::Full,
            encoding: current_encoding(),
        }
    }

    #[must_use]
    pub fn integer_only() -> Self {
        Self {
            floats: FloatSupport::IntegerOnly,
            ..Self::full()
        }
    }

    #[must_use]
    pub fn with_encoding(self, encoding: Encoding) -> Self {
        Self { encoding, ..self }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::full()
    }
}

const CHUNK: usize = 256;

/// Composes output into a fixed chunk and counts every logical byte.
struct Emitter<'s, S: OutputSink + ?Sized> {
    sink: &'s mut S,
    chunk: [u8; CHUNK],
    filled: usize,
    total: usize,
}

impl<'s, S: OutputSink + ?Sized> Emitter<'s, S> {
    fn new(sink: &'s mut S) -> Self {
        Self {
            sink,
            chunk: [0; CHUNK],
            filled: 0,
            total: 0,
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.filled == 0 {
            return Ok(());
        }
        let n = std::mem::take(&mut self.filled);
        self.sink.write_chunk(&self.chunk[..n])
    }
}

impl<S: OutputSink + ?Sized> FieldSink for Emitter<'_, S> {
    fn put(&mut self, mut bytes: &[u8]) -> Result<()> {
        self.total = self
            .total
            .checked_add(bytes.len())
            .filter(|&total| total <= i32::MAX as usize)
            .ok_or(StdioError::Overflow)?;
        while !bytes.is_empty() {
            if self.filled == CHUNK {
                self.flush()?;
            }
            let n = (CHUNK - self.filled).min(bytes.len());
            self.chunk[self.filled..self.filled + n].copy_from_slice(&bytes[..n]);
            self.filled += n;
            bytes = &bytes[n..];
        }
        Ok(())
    }
}

/// Expand `fmt` with `args` into `sink` (`vfprintf`).
///
/// Returns the number of bytes the expanded output occupies, which for a
/// truncating sink may exceed what it stored. On any error the output
/// composed so far is still delivered and the sink is finished, so buffers
/// stay terminated; bytes already delivered are not retracted.
pub fn format<S: OutputSink + ?Sized>(
    sink: &mut S,
    options: &FormatOptions,
    fmt: &[u8],
    args: &[FormatArg<'_>],
) -> Result<usize> {
    let mut out = Emitter::new(sink);
    let rendered = render(&mut out, options, fmt, args);
    let flushed = out.flush();
    let finished = out.sink.finish();
    match rendered.and(flushed).and(finished) {
        Ok(()) => Ok(out.total),
        Err(err) => {
            log::debug!("format aborted after {} bytes: {err}", out.total);
            Err(err)
        }
    }
}

fn render<S: OutputSink + ?Sized>(
    out: &mut Emitter<'_, S>,
    options: &FormatOptions,
    fmt: &[u8],
    args: &[FormatArg<'_>],
) -> Result<()> {
    let mut args = ArgCursor::new(args);
    for segment in FormatCursor::new(fmt) {
        match segment? {
            FormatSegment::Literal(bytes) => out.put(bytes)?,
            FormatSegment::Percent => out.put(b"%")?,
            FormatSegment::Spec(spec) => {
                let spec = resolve_star_fields(spec, &mut args)?;
                expand(out, options, &spec, &mut args)?;
            }
        }
    }
    Ok(())
}

/// Replace `*` width and precision with values taken from the arguments.
///
/// Values beyond `INT_MAX` in magnitude fail with [`StdioError::Overflow`],
/// like widths written in the format string.
fn resolve_star_fields(mut spec: FormatSpec, args: &mut ArgCursor<'_, '_>) -> Result<FormatSpec> {
    if spec.width == Width::FromArg {
        let w = args.next_int()?;
        if w < 0 {
            spec.flags.left_justify = true;
        }
        spec.width = Width::Fixed(bounded_field(u64::from(w.unsigned_abs()))?);
    }
    if spec.precision == Precision::FromArg {
        let p = args.next_int()?;
        spec.precision = match u64::try_from(p) {
            Ok(p) => Precision::Fixed(bounded_field(p)?),
            Err(_) => Precision::None,
        };
    }
    Ok(spec)
}

fn bounded_field(value: u64) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&v| v <= MAX_FIELD)
        .ok_or(StdioError::Overflow)
}

fn expand<S: OutputSink + ?Sized>(
    out: &mut Emitter<'_, S>,
    options: &FormatOptions,
    spec: &FormatSpec,
    args: &mut ArgCursor<'_, '_>,
) -> Result<()> {
    let wide = spec.length == LengthMod::L;
    match spec.conversion {
        b'd' | b'i' => format_signed(args.next_signed(spec.length)?, spec, out),
        b'u' | b'o' | b'x' | b'X' => format_unsigned(args.next_unsigned(spec.length)?, spec, out),
        b'c' if wide => wide_char(out, options.encoding, spec, args.next_wide_char()?),
        b'C' => wide_char(out, options.encoding, spec, args.next_wide_char()?),
        b'c' => format_char(args.next_char()?, spec, out),
        b's' if wide => wide_str(out, options.encoding, spec, args.next_wide_str()?),
        b'S' => wide_str(out, options.encoding, spec, args.next_wide_str()?),
        b's' => format_str(args.next_str()?.unwrap_or(b"(null)"), spec, out),
        b'p' => format_pointer(args.next_pointer()?, spec, out),
        b'n' => {
            let count = i64::try_from(out.total).map_err(|_| StdioError::Overflow)?;
            args.next_count()?.set(truncate_signed(count, spec.length));
            Ok(())
        }
        b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A'
            if options.floats == FloatSupport::Full =>
        {
            format_float(args.next_float()?, spec, out)
        }
        // Unknown conversions, and floats in the integer-only writer, print
        // the conversion character itself and consume no argument.
        other => format_char(other, spec, out),
    }
}

fn wide_char<S: OutputSink + ?Sized>(
    out: &mut Emitter<'_, S>,
    encoding: Encoding,
    spec: &FormatSpec,
    wc: u32,
) -> Result<()> {
    let mut buf = [0u8; MB_LEN_MAX];
    let mut state = ConversionState::new();
    let n = multibyte::encode_one(encoding, Some(&mut buf), wc, Some(&mut state))?;
    let mut spec = *spec;
    spec.precision = Precision::None;
    // A NUL character is still one byte of output; `format_str` would stop at it.
    emit_padded(out, &spec, b"", &[&buf[..n]], false)
}

/// Bytes that bring `state` back to the initial shift, excluding the
/// terminator the reset sequence ends with.
fn shift_reset(encoding: Encoding, state: &mut ConversionState, buf: &mut [u8; MB_LEN_MAX]) -> Result<usize> {
    if state.is_initial() {
        return Ok(0);
    }
    let n = multibyte::encode_one(encoding, Some(&mut buf[..]), 0, Some(state))?;
    Ok(n - 1)
}

/// Bytes `%ls` produces for `s` within `limit`, without emitting them.
fn wide_str_len(encoding: Encoding, s: &[u32], limit: usize) -> Result<usize> {
    let mut state = ConversionState::new();
    let mut scratch = [0u8; MB_LEN_MAX];
    let mut total = 0usize;
    for &wc in s.iter().take_while(|&&wc| wc != 0) {
        if total >= limit {
            break;
        }
        let mut next = state;
        let n = multibyte::encode_one(encoding, Some(&mut scratch[..]), wc, Some(&mut next))?;
        if total + n > limit {
            break;
        }
        total += n;
        state = next;
    }
    let n = shift_reset(encoding, &mut state, &mut scratch)?;
    if n > 0 && total + n <= limit {
        total += n;
    }
    Ok(total)
}

/// Stream `s` through `encode_string` into the emitter, at most `limit`
/// bytes and never a partial character. Returns the bytes emitted.
///
/// On an unencodable character the bytes of the characters before it are
/// emitted before the error is returned. A stateful encoding is shifted
/// back to its initial state at the end when the limit leaves room.
fn stream_wide_str<S: OutputSink + ?Sized>(
    out: &mut Emitter<'_, S>,
    encoding: Encoding,
    s: &[u32],
    limit: usize,
) -> Result<usize> {
    let mut state = ConversionState::new();
    let mut buf = [0u8; CHUNK];
    let mut cursor = Some(s);
    let mut emitted = 0usize;

    while let Some(rest) = cursor.filter(|rest| !rest.is_empty()) {
        let room = (limit - emitted).min(buf.len());
        let before = state;
        match multibyte::encode_string(encoding, Some(&mut buf[..room]), &mut cursor, Some(&mut state)) {
            Ok(0) => break,
            Ok(n) => {
                out.put(&buf[..n])?;
                emitted += n;
            }
            Err(err) => {
                let done = rest.len() - cursor.map_or(0, <[u32]>::len);
                let mut prefix = Some(&rest[..done]);
                let mut replay = before;
                let n = multibyte::encode_string(encoding, None, &mut prefix, Some(&mut replay))?;
                out.put(&buf[..n])?;
                return Err(err);
            }
        }
    }
    let mut tail = [0u8; MB_LEN_MAX];
    let n = shift_reset(encoding, &mut state, &mut tail)?;
    if n > 0 && emitted + n <= limit {
        out.put(&tail[..n])?;
        emitted += n;
    }
    Ok(emitted)
}

fn wide_str<S: OutputSink + ?Sized>(
    out: &mut Emitter<'_, S>,
    encoding: Encoding,
    spec: &FormatSpec,
    s: Option<&[u32]>,
) -> Result<()> {
    let Some(s) = s else {
        return format_str(b"(null)", spec, out);
    };
    let limit = spec.precision.fixed().unwrap_or(usize::MAX);
    let width = spec.min_width();

    if spec.pads_left() {
        let len = wide_str_len(encoding, s, limit)?;
        out.pad(b' ', width.saturating_sub(len))?;
        stream_wide_str(out, encoding, s, limit)?;
        return Ok(());
    }
    let len = stream_wide_str(out, encoding, s, limit)?;
    out.pad(b' ', width.saturating_sub(len))
}
