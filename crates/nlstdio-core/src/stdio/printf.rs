//! printf-family directive parsing and field rendering.
//!
//! A format string is walked by [`FormatCursor`], which yields literal runs
//! and parsed directives left to right. Renderers write one expanded field
//! through a [`FieldSink`], applying width, precision and flag rules the way
//! C `printf` does.

use crate::error::{Result, StdioError};

/// Directive flags (`-`, `+`, space, `#`, `0`, `'`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags {
    pub left_justify: bool,
    pub force_sign: bool,
    pub space_sign: bool,
    pub alt_form: bool,
    pub zero_pad: bool,
    /// Thousands grouping. Accepted and ignored: the C locale has no grouping.
    pub grouping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    None,
    Fixed(usize),
    FromArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    None,
    Fixed(usize),
    FromArg,
}

impl Precision {
    #[must_use]
    pub fn fixed(self) -> Option<usize> {
        match self {
            Self::Fixed(p) => Some(p),
            _ => None,
        }
    }
}

/// Length modifier preceding the conversion character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMod {
    None,
    /// `hh`
    Hh,
    /// `h`
    H,
    /// `l`
    L,
    /// `ll` or `q`
    Ll,
    /// `j`
    J,
    /// `z`
    Z,
    /// `t`
    T,
    /// `L`
    BigL,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: FormatFlags,
    pub width: Width,
    pub precision: Precision,
    pub length: LengthMod,
    pub conversion: u8,
}

impl FormatSpec {
    /// Field width once `*` has been resolved. An unresolved `*` counts as none.
    #[must_use]
    pub fn min_width(&self) -> usize {
        match self.width {
            Width::Fixed(w) => w,
            _ => 0,
        }
    }

    /// Whether padding precedes the field content.
    #[must_use]
    pub fn pads_left(&self) -> bool {
        !self.flags.left_justify && self.min_width() > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSegment<'a> {
    Literal(&'a [u8]),
    Percent,
    Spec(FormatSpec),
}

/// Widths and precisions above `INT_MAX` make the call fail, as in C.
pub(crate) const MAX_FIELD: usize = i32::MAX as usize;

fn parse_decimal(fmt: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value = 0usize;
    while let Some(d) = fmt.get(*pos).filter(|b| b.is_ascii_digit()) {
        value = value * 10 + usize::from(d - b'0');
        if value > MAX_FIELD {
            return Err(StdioError::Overflow);
        }
        *pos += 1;
    }
    Ok(value)
}

/// Parse the directive whose `%` sits at `fmt[percent]`.
///
/// Returns the directive and the index just past its conversion character.
/// A format string that ends before the conversion character fails with
/// [`StdioError::MalformedDirective`] pointing at the `%`.
pub fn parse_format_spec(fmt: &[u8], percent: usize) -> Result<(FormatSpec, usize)> {
    let malformed = StdioError::MalformedDirective { offset: percent };
    let mut pos = percent + 1;
    let mut flags = FormatFlags::default();

    while let Some(&b) = fmt.get(pos) {
        match b {
            b'-' => flags.left_justify = true,
            b'+' => flags.force_sign = true,
            b' ' => flags.space_sign = true,
            b'#' => flags.alt_form = true,
            b'0' => flags.zero_pad = true,
            b'\'' => flags.grouping = true,
            _ => break,
        }
        pos += 1;
    }

    let width = match fmt.get(pos) {
        Some(b'*') => {
            pos += 1;
            Width::FromArg
        }
        Some(b) if b.is_ascii_digit() => Width::Fixed(parse_decimal(fmt, &mut pos)?),
        _ => Width::None,
    };

    let precision = if fmt.get(pos) == Some(&b'.') {
        pos += 1;
        if fmt.get(pos) == Some(&b'*') {
            pos += 1;
            Precision::FromArg
        } else {
            Precision::Fixed(parse_decimal(fmt, &mut pos)?)
        }
    } else {
        Precision::None
    };

    let length = match fmt.get(pos) {
        Some(b'h') if fmt.get(pos + 1) == Some(&b'h') => {
            pos += 2;
            LengthMod::Hh
        }
        Some(b'l') if fmt.get(pos + 1) == Some(&b'l') => {
            pos += 2;
            LengthMod::Ll
        }
        Some(&b) => {
            let length = match b {
                b'h' => LengthMod::H,
                b'l' => LengthMod::L,
                b'q' => LengthMod::Ll,
                b'j' => LengthMod::J,
                b'z' => LengthMod::Z,
                b't' => LengthMod::T,
                b'L' => LengthMod::BigL,
                _ => LengthMod::None,
            };
            if length != LengthMod::None {
                pos += 1;
            }
            length
        }
        None => return Err(malformed),
    };

    let conversion = *fmt.get(pos).ok_or(malformed)?;
    Ok((
        FormatSpec {
            flags,
            width,
            precision,
            length,
            conversion,
        },
        pos + 1,
    ))
}

/// Streaming position within a format string.
///
/// The format ends at its first NUL byte or at the end of the slice. After
/// an error the cursor is exhausted.
#[derive(Debug, Clone)]
pub struct FormatCursor<'a> {
    fmt: &'a [u8],
    pos: usize,
}

impl<'a> FormatCursor<'a> {
    #[must_use]
    pub fn new(fmt: &'a [u8]) -> Self {
        let end = fmt.iter().position(|&b| b == 0).unwrap_or(fmt.len());
        Self {
            fmt: &fmt[..end],
            pos: 0,
        }
    }

    /// Byte offset of the next segment.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for FormatCursor<'a> {
    type Item = Result<FormatSegment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.fmt.get(self.pos..).filter(|r| !r.is_empty())?;
        if rest[0] != b'%' {
            let run = rest.iter().position(|&b| b == b'%').unwrap_or(rest.len());
            self.pos += run;
            return Some(Ok(FormatSegment::Literal(&rest[..run])));
        }
        match parse_format_spec(self.fmt, self.pos) {
            Ok((spec, next)) => {
                self.pos = next;
                if spec.conversion == b'%' {
                    Some(Ok(FormatSegment::Percent))
                } else {
                    Some(Ok(FormatSegment::Spec(spec)))
                }
            }
            Err(err) => {
                self.pos = self.fmt.len();
                Some(Err(err))
            }
        }
    }
}

/// Parse a whole format string into segments.
pub fn parse_format_string(fmt: &[u8]) -> Result<Vec<FormatSegment<'_>>> {
    FormatCursor::new(fmt).collect()
}

/// Destination for the bytes of one rendered field.
pub trait FieldSink {
    fn put(&mut self, bytes: &[u8]) -> Result<()>;

    fn pad(&mut self, byte: u8, count: usize) -> Result<()> {
        let run = [byte; 32];
        let mut left = count;
        while left > 0 {
            let n = left.min(run.len());
            self.put(&run[..n])?;
            left -= n;
        }
        Ok(())
    }
}

impl FieldSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Emit `prefix` and `body` padded to the field width.
///
/// With `zero_fill` the padding goes between prefix and body as `0`s,
/// otherwise it is spaces on the side opposite the justification.
pub(crate) fn emit_padded<S: FieldSink + ?Sized>(
    out: &mut S,
    spec: &FormatSpec,
    prefix: &[u8],
    body: &[&[u8]],
    zero_fill: bool,
) -> Result<()> {
    let len = prefix.len() + body.iter().map(|part| part.len()).sum::<usize>();
    let fill = spec.min_width().saturating_sub(len);
    if spec.flags.left_justify {
        out.put(prefix)?;
        for part in body {
            out.put(part)?;
        }
        return out.pad(b' ', fill);
    }
    if zero_fill {
        out.put(prefix)?;
        out.pad(b'0', fill)?;
    } else {
        out.pad(b' ', fill)?;
        out.put(prefix)?;
    }
    for part in body {
        out.put(part)?;
    }
    Ok(())
}

/// Digits of `value` in `base`, most significant first.
fn digits(mut value: u64, base: u64, upper: bool, buf: &mut [u8; 24]) -> &[u8] {
    let table: &[u8; 16] = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = table[(value % base) as usize];
        value /= base;
        if value == 0 {
            break;
        }
    }
    &buf[i..]
}

fn emit_integer<S: FieldSink + ?Sized>(
    out: &mut S,
    spec: &FormatSpec,
    prefix: &[u8],
    body: &[u8],
    min_digits: usize,
) -> Result<()> {
    let leading = min_digits.saturating_sub(body.len());
    let len = prefix.len().saturating_add(leading).saturating_add(body.len());
    let fill = spec.min_width().saturating_sub(len);
    if spec.flags.left_justify {
        out.put(prefix)?;
        out.pad(b'0', leading)?;
        out.put(body)?;
        return out.pad(b' ', fill);
    }
    // A precision turns off the `0` flag for integers.
    if spec.flags.zero_pad && spec.precision.fixed().is_none() {
        out.put(prefix)?;
        out.pad(b'0', fill)?;
    } else {
        out.pad(b' ', fill)?;
        out.put(prefix)?;
    }
    out.pad(b'0', leading)?;
    out.put(body)
}

/// Digits shown for an integer: `%.0d` of zero prints none.
fn shown_digits<'a>(value_digits: &'a [u8], is_zero: bool, spec: &FormatSpec) -> (&'a [u8], usize) {
    let precision = spec.precision.fixed();
    if is_zero && precision == Some(0) {
        (&[], 0)
    } else {
        (value_digits, precision.unwrap_or(0))
    }
}

fn sign_prefix(negative: bool, spec: &FormatSpec) -> &'static [u8] {
    if negative {
        b"-"
    } else if spec.flags.force_sign {
        b"+"
    } else if spec.flags.space_sign {
        b" "
    } else {
        b""
    }
}

/// Render `%d`/`%i`.
pub fn format_signed<S: FieldSink + ?Sized>(value: i64, spec: &FormatSpec, out: &mut S) -> Result<()> {
    let mut buf = [0u8; 24];
    let magnitude = digits(value.unsigned_abs(), 10, false, &mut buf);
    let (body, min_digits) = shown_digits(magnitude, value == 0, spec);
    emit_integer(out, spec, sign_prefix(value < 0, spec), body, min_digits)
}

/// Render `%u`, `%o`, `%x` and `%X`.
pub fn format_unsigned<S: FieldSink + ?Sized>(value: u64, spec: &FormatSpec, out: &mut S) -> Result<()> {
    let mut buf = [0u8; 24];
    let (base, upper) = match spec.conversion {
        b'o' => (8, false),
        b'x' => (16, false),
        b'X' => (16, true),
        _ => (10, false),
    };
    let value_digits = digits(value, base, upper, &mut buf);
    let (body, mut min_digits) = shown_digits(value_digits, value == 0, spec);
    let prefix: &[u8] = match spec.conversion {
        b'x' if spec.flags.alt_form && value != 0 => b"0x",
        b'X' if spec.flags.alt_form && value != 0 => b"0X",
        _ => b"",
    };
    // `#o` guarantees the first digit shown is a zero.
    if spec.conversion == b'o' && spec.flags.alt_form && body.first() != Some(&b'0') {
        min_digits = min_digits.max(body.len() + 1);
    }
    emit_integer(out, spec, prefix, body, min_digits)
}

/// Render `%c`, and conversion characters passed through verbatim.
pub fn format_char<S: FieldSink + ?Sized>(byte: u8, spec: &FormatSpec, out: &mut S) -> Result<()> {
    emit_padded(out, spec, b"", &[&[byte]], false)
}

/// Render `%s`. The precision bounds the number of bytes taken.
pub fn format_str<S: FieldSink + ?Sized>(bytes: &[u8], spec: &FormatSpec, out: &mut S) -> Result<()> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let end = spec.precision.fixed().map_or(end, |p| end.min(p));
    emit_padded(out, spec, b"", &[&bytes[..end]], false)
}

/// Render `%p` as `0x` followed by lowercase hex.
pub fn format_pointer<S: FieldSink + ?Sized>(addr: usize, spec: &FormatSpec, out: &mut S) -> Result<()> {
    let mut buf = [0u8; 24];
    let value_digits = digits(addr as u64, 16, false, &mut buf);
    emit_integer(out, spec, b"0x", value_digits, spec.precision.fixed().unwrap_or(0))
}
