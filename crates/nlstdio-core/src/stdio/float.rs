//! Floating-point conversions: `%f %F %e %E %g %G %a %A`.

use super::printf::{FieldSink, FormatSpec, emit_padded};
use crate::error::Result;

const DEFAULT_PRECISION: usize = 6;

/// Render one floating-point directive.
pub fn format_float<S: FieldSink + ?Sized>(value: f64, spec: &FormatSpec, out: &mut S) -> Result<()> {
    let upper = spec.conversion.is_ascii_uppercase();
    let sign: &[u8] = if value.is_sign_negative() {
        b"-"
    } else if spec.flags.force_sign {
        b"+"
    } else if spec.flags.space_sign {
        b" "
    } else {
        b""
    };

    if !value.is_finite() {
        let word: &[u8] = match (value.is_nan(), upper) {
            (true, false) => b"nan",
            (true, true) => b"NAN",
            (false, false) => b"inf",
            (false, true) => b"INF",
        };
        return emit_padded(out, spec, sign, &[word], false);
    }

    let magnitude = value.abs();
    let precision = spec.precision.fixed();
    let alt = spec.flags.alt_form;
    let (mut prefix, mut body): (Vec<u8>, String) = match spec.conversion.to_ascii_lowercase() {
        b'e' => (sign.to_vec(), exponential(magnitude, precision.unwrap_or(DEFAULT_PRECISION), alt)),
        b'g' => (sign.to_vec(), general(magnitude, precision.unwrap_or(DEFAULT_PRECISION), alt)),
        b'a' => {
            let mut prefix = sign.to_vec();
            prefix.extend_from_slice(b"0x");
            (prefix, hexadecimal(magnitude, precision, alt))
        }
        _ => (sign.to_vec(), fixed(magnitude, precision.unwrap_or(DEFAULT_PRECISION), alt)),
    };

    if upper {
        prefix.make_ascii_uppercase();
        body.make_ascii_uppercase();
    }
    emit_padded(out, spec, &prefix, &[body.as_bytes()], spec.flags.zero_pad)
}

fn fixed(value: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{value:.precision$}");
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// Split Rust's `{:e}` output into mantissa and decimal exponent.
fn rust_exponential(value: f64, precision: usize) -> (String, i32) {
    let s = format!("{value:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_owned(), exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn push_exponent(s: &mut String, marker: char, exp: i32, min_digits: usize) {
    s.push(marker);
    s.push(if exp < 0 { '-' } else { '+' });
    let digits = exp.unsigned_abs().to_string();
    for _ in digits.len()..min_digits {
        s.push('0');
    }
    s.push_str(&digits);
}

fn exponential(value: f64, precision: usize, alt: bool) -> String {
    let (mut s, exp) = rust_exponential(value, precision);
    if alt && precision == 0 {
        s.push('.');
    }
    push_exponent(&mut s, 'e', exp, 2);
    s
}

fn strip_fraction_zeros(s: &mut String) {
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
}

fn general(value: f64, precision: usize, alt: bool) -> String {
    let p = precision.max(1);
    // The exponent after rounding to `p` significant digits picks the style.
    let (_, exp) = rust_exponential(value, p - 1);
    let exp = if value == 0.0 { 0 } else { exp };
    let p_i = i32::try_from(p).unwrap_or(i32::MAX);
    if exp < -4 || exp >= p_i {
        let (mut s, exp) = rust_exponential(value, p - 1);
        if alt {
            if !s.contains('.') {
                s.push('.');
            }
        } else {
            strip_fraction_zeros(&mut s);
        }
        push_exponent(&mut s, 'e', exp, 2);
        s
    } else {
        let decimals = usize::try_from(p_i - 1 - exp).unwrap_or(0);
        let mut s = format!("{value:.decimals$}");
        if alt {
            if !s.contains('.') {
                s.push('.');
            }
        } else {
            strip_fraction_zeros(&mut s);
        }
        s
    }
}

const MANTISSA_BITS: u32 = 52;
const MANTISSA_NIBBLES: usize = 13;

/// `%a` body after the `0x` prefix, e.g. `1.8p+1`.
fn hexadecimal(value: f64, precision: Option<usize>, alt: bool) -> String {
    let bits = value.to_bits();
    let biased = ((bits >> MANTISSA_BITS) & 0x7FF) as i32;
    let mut mantissa = bits & ((1u64 << MANTISSA_BITS) - 1);
    let (mut lead, exp) = match (biased, mantissa) {
        (0, 0) => (0u64, 0),
        (0, _) => (0, -1022),
        _ => (1, biased - 1023),
    };

    let nibbles = match precision {
        Some(p) if p < MANTISSA_NIBBLES => {
            let shift = (MANTISSA_NIBBLES - p) as u32 * 4;
            let rem = mantissa & ((1u64 << shift) - 1);
            let half = 1u64 << (shift - 1);
            mantissa >>= shift;
            if rem > half || (rem == half && (mantissa & 1 == 1 || (p == 0 && lead & 1 == 1))) {
                mantissa += 1;
            }
            if p == 0 || mantissa >> (p as u32 * 4) != 0 {
                lead += mantissa >> (p as u32 * 4);
                mantissa &= (1u64 << (p as u32 * 4)).wrapping_sub(1);
            }
            p
        }
        Some(p) => p,
        None => {
            if mantissa == 0 {
                0
            } else {
                let trailing = (mantissa.trailing_zeros() / 4) as usize;
                mantissa >>= trailing as u32 * 4;
                MANTISSA_NIBBLES - trailing
            }
        }
    };

    let mut s = format!("{lead:x}");
    if nibbles > 0 || alt {
        s.push('.');
    }
    if nibbles > 0 {
        let shown = nibbles.min(MANTISSA_NIBBLES);
        s.push_str(&format!("{mantissa:0shown$x}"));
        for _ in shown..nibbles {
            s.push('0');
        }
    }
    push_exponent(&mut s, 'p', exp, 1);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdio::printf::parse_format_spec;
    use proptest::prelude::*;

    fn render(directive: &str, value: f64) -> String {
        let (spec, _) = parse_format_spec(directive.as_bytes(), 0).expect("directive parses");
        let mut out = Vec::new();
        format_float(value, &spec, &mut out).expect("render");
        String::from_utf8(out).expect("ascii output")
    }

    #[test]
    fn fixed_forms() {
        assert_eq!(render("%f", 3.5), "3.500000");
        assert_eq!(render("%.2f", -1.005), "-1.00");
        assert_eq!(render("%.0f", 2.4), "2");
        assert_eq!(render("%#.0f", 2.0), "2.");
        assert_eq!(render("%+08.2f", 3.14159), "+0003.14");
        assert_eq!(render("%-8.1f", 1.0), "1.0     ");
        assert_eq!(render("%F", f64::INFINITY), "INF");
        assert_eq!(render("%05f", f64::NEG_INFINITY), " -inf");
        assert_eq!(render("%f", f64::NAN), "nan");
        assert_eq!(render("%f", -0.0), "-0.000000");
    }

    #[test]
    fn exponential_forms() {
        assert_eq!(render("%e", 12345.678), "1.234568e+04");
        assert_eq!(render("%E", 0.00012), "1.200000E-04");
        assert_eq!(render("%.0e", 5.0), "5e+00");
        assert_eq!(render("%#.0e", 5.0), "5.e+00");
        assert_eq!(render("%e", 0.0), "0.000000e+00");
        assert_eq!(render("%e", 1e300), "1.000000e+300");
    }

    #[test]
    fn general_forms() {
        assert_eq!(render("%g", 100000.0), "100000");
        assert_eq!(render("%g", 1000000.0), "1e+06");
        assert_eq!(render("%g", 0.0001), "0.0001");
        assert_eq!(render("%g", 0.00001), "1e-05");
        assert_eq!(render("%G", 1.5e-10), "1.5E-10");
        assert_eq!(render("%g", 0.0), "0");
        assert_eq!(render("%.3g", 3.14159), "3.14");
        assert_eq!(render("%#g", 1.0), "1.00000");
        assert_eq!(render("%g", 999999.5), "1e+06");
    }

    #[test]
    fn hexadecimal_forms() {
        assert_eq!(render("%a", 1.0), "0x1p+0");
        assert_eq!(render("%a", 3.0), "0x1.8p+1");
        assert_eq!(render("%A", -0.5), "-0X1P-1");
        assert_eq!(render("%a", 0.0), "0x0p+0");
        assert_eq!(render("%.1a", 1.0), "0x1.0p+0");
        assert_eq!(render("%.0a", 1.5), "0x2p+0");
        assert_eq!(render("%.1a", 1.96875), "0x2.0p+0");
        assert_eq!(render("%a", f64::from_bits(1)), "0x0.0000000000001p-1022");
        assert_eq!(render("%010a", 1.0), "0x00001p+0");
    }

    proptest! {
        #[test]
        fn prop_fixed_matches_std(v in -1e12f64..1e12, precision in 0usize..10) {
            let out = render(&format!("%.{precision}f"), v);
            prop_assert_eq!(out, format!("{v:.precision$}"));
        }

        #[test]
        fn prop_exponential_round_trips(v in -1e200f64..1e200) {
            let out = render("%.17e", v);
            let parsed: f64 = out.parse().expect("C exponent syntax parses");
            prop_assert_eq!(parsed, v);
        }
    }
}
