//! Multibyte ↔ wide character conversion.
//!
//! Implements the `mbrtowc`/`wcrtomb`/`mbsnrtowcs`/`wcsnrtombs` contracts
//! over every [`Encoding`]. Wide characters are `u32` (`wchar_t` on Linux).
//!
//! Each operation accepts an optional [`ConversionState`]; `None` selects
//! the calling thread's implicit state for that operation, never a
//! process-wide one.

mod japanese;
mod single;
mod state;
mod utf8;

pub use state::{ConversionState, DefaultSlot, with_default_state};

use crate::error::{Result, StdioError};
use crate::locale::Encoding;

/// Upper bound of `MB_CUR_MAX` over all encodings.
pub const MB_LEN_MAX: usize = 8;

/// Decode one character. `src` is non-empty. On success or an incomplete
/// sequence the state is updated; on an invalid sequence it is untouched.
fn decode_char(
    encoding: Encoding,
    out: &mut u32,
    src: &[u8],
    state: &mut ConversionState,
) -> Result<usize> {
    let mut next = *state;
    let result = match encoding {
        Encoding::Ascii => single::decode_ascii(out, src),
        Encoding::Latin1 => single::decode_latin1(out, src),
        Encoding::Utf8 => utf8::decode(out, src, &mut next),
        Encoding::EucJp => japanese::decode_eucjp(out, src, &mut next),
        Encoding::ShiftJis => japanese::decode_sjis(out, src, &mut next),
        Encoding::Jis => japanese::decode_jis(out, src, &mut next),
    };
    if matches!(result, Ok(_) | Err(StdioError::IncompleteSequence)) {
        *state = next;
    }
    result
}

/// Encode one character into `buf`. The state only changes on success.
fn encode_char(
    encoding: Encoding,
    buf: &mut [u8; MB_LEN_MAX],
    wc: u32,
    state: &mut ConversionState,
) -> Result<usize> {
    let mut next = *state;
    let n = match encoding {
        Encoding::Ascii => single::encode_ascii(buf, wc),
        Encoding::Latin1 => single::encode_latin1(buf, wc),
        Encoding::Utf8 => utf8::encode(buf, wc),
        Encoding::EucJp => japanese::encode_eucjp(buf, wc),
        Encoding::ShiftJis => japanese::encode_sjis(buf, wc),
        Encoding::Jis => japanese::encode_jis(buf, wc, &mut next),
    }?;
    *state = next;
    Ok(n)
}

fn with_state<R>(
    state: Option<&mut ConversionState>,
    slot: DefaultSlot,
    f: impl FnOnce(&mut ConversionState) -> R,
) -> R {
    match state {
        Some(state) => f(state),
        None => with_default_state(slot, f),
    }
}

/// Decode one character from `src` (`mbrtowc`).
///
/// - `src == None`: resets the state; returns 1 for stateful encodings and
///   0 otherwise.
/// - empty `src`: [`StdioError::IncompleteSequence`], state untouched.
/// - terminator: writes 0 to `dst` and returns 0.
/// - otherwise writes the character and returns the bytes consumed from
///   `src`. A valid but unfinished prefix is kept in the state and reported
///   as incomplete; the call that finishes it counts only its own bytes.
///
/// On [`StdioError::InvalidSequence`] neither `dst` nor the state changes.
pub fn decode_one(
    encoding: Encoding,
    dst: Option<&mut u32>,
    src: Option<&[u8]>,
    state: Option<&mut ConversionState>,
) -> Result<usize> {
    with_state(state, DefaultSlot::Decode, |state| {
        decode_one_in(encoding, dst, src, state)
    })
}

fn decode_one_in(
    encoding: Encoding,
    dst: Option<&mut u32>,
    src: Option<&[u8]>,
    state: &mut ConversionState,
) -> Result<usize> {
    let Some(src) = src else {
        log::trace!("{} decode state reset", encoding.charset_name());
        state.reset();
        return Ok(usize::from(encoding.is_stateful()));
    };
    if src.is_empty() {
        return Err(StdioError::IncompleteSequence);
    }
    let mut wc = 0;
    let n = decode_char(encoding, &mut wc, src, state)?;
    if let Some(dst) = dst {
        *dst = wc;
    }
    Ok(n)
}

/// Encode one wide character (`wcrtomb`).
///
/// With `dst == None` the length is computed against a scratch buffer and
/// a copy of the state, so nothing observable changes. A destination too
/// short for the character fails with [`StdioError::InsufficientSpace`]
/// and leaves the state alone.
pub fn encode_one(
    encoding: Encoding,
    dst: Option<&mut [u8]>,
    wc: u32,
    state: Option<&mut ConversionState>,
) -> Result<usize> {
    with_state(state, DefaultSlot::Encode, |state| {
        encode_one_in(encoding, dst, wc, state)
    })
}

fn encode_one_in(
    encoding: Encoding,
    dst: Option<&mut [u8]>,
    wc: u32,
    state: &mut ConversionState,
) -> Result<usize> {
    let mut buf = [0u8; MB_LEN_MAX];
    let Some(dst) = dst else {
        let mut probe = *state;
        return encode_char(encoding, &mut buf, wc, &mut probe);
    };
    let mut next = *state;
    let n = encode_char(encoding, &mut buf, wc, &mut next)?;
    if dst.len() < n {
        return Err(StdioError::InsufficientSpace { needed: n });
    }
    dst[..n].copy_from_slice(&buf[..n]);
    *state = next;
    Ok(n)
}

/// Decode a multibyte string (`mbsnrtowcs`).
///
/// Converts characters from `*src` into `dst` until `dst` is full, the
/// terminator is decoded, or the source slice runs out. The terminator is
/// stored but not counted, and `*src` becomes `None`. A source consumed to
/// its end in the initial state also leaves `*src` as `None`. When the
/// source runs out inside a character, or in a shifted state, the cursor
/// is the empty tail of the slice and the pending bytes stay in the state.
///
/// On error, `dst` holds the characters decoded before the failure, `*src`
/// points at the first byte of the offending character, and the state is
/// reset.
///
/// With `dst == None` characters are only counted, without limit, and the
/// cursor is left where it was.
pub fn decode_string(
    encoding: Encoding,
    dst: Option<&mut [u32]>,
    src: &mut Option<&[u8]>,
    state: Option<&mut ConversionState>,
) -> Result<usize> {
    with_state(state, DefaultSlot::Mbsrtowcs, |state| {
        decode_string_in(encoding, dst, src, state)
    })
}

fn decode_string_in(
    encoding: Encoding,
    mut dst: Option<&mut [u32]>,
    src: &mut Option<&[u8]>,
    state: &mut ConversionState,
) -> Result<usize> {
    let Some(mut cursor) = *src else {
        return Ok(0);
    };
    let count_only = dst.is_none();
    let limit = dst.as_ref().map_or(usize::MAX, |d| d.len());
    let mut count = 0usize;

    while count < limit {
        let mut wc = 0;
        match decode_one_in(encoding, Some(&mut wc), Some(cursor), state) {
            Ok(0) => {
                if let Some(dst) = dst.as_deref_mut() {
                    dst[count] = 0;
                }
                if !count_only {
                    *src = None;
                }
                return Ok(count);
            }
            Ok(n) => {
                if let Some(dst) = dst.as_deref_mut() {
                    dst[count] = wc;
                }
                cursor = &cursor[n..];
                count += 1;
            }
            Err(StdioError::IncompleteSequence) => {
                cursor = &cursor[cursor.len()..];
                break;
            }
            Err(err) => {
                state.reset();
                if !count_only {
                    *src = Some(cursor);
                }
                return Err(err);
            }
        }
    }

    if !count_only {
        *src = drained_cursor(cursor, state);
    }
    Ok(count)
}

/// The cursor left after a conversion that stopped without an error.
/// A source consumed to its end with nothing pending becomes `None`.
fn drained_cursor<'a, T>(rest: &'a [T], state: &ConversionState) -> Option<&'a [T]> {
    if rest.is_empty() && state.is_initial() {
        None
    } else {
        Some(rest)
    }
}

/// Encode a wide string (`wcsnrtombs`).
///
/// Converts characters from `*src` into `dst` until the next character no
/// longer fits whole (the state is rolled back to before it), the source
/// runs out, or the terminator is converted. On the terminator the
/// returned count excludes its byte and `*src` becomes `None`; so does a
/// source consumed to its end that leaves the state initial.
///
/// On error, `dst` keeps the bytes of the characters before the failure,
/// `*src` points at the offending character, and the state is reset.
///
/// With `dst == None` bytes are only counted, without limit, and the
/// cursor is left where it was.
pub fn encode_string(
    encoding: Encoding,
    dst: Option<&mut [u8]>,
    src: &mut Option<&[u32]>,
    state: Option<&mut ConversionState>,
) -> Result<usize> {
    with_state(state, DefaultSlot::Wcsrtombs, |state| {
        encode_string_in(encoding, dst, src, state)
    })
}

fn encode_string_in(
    encoding: Encoding,
    mut dst: Option<&mut [u8]>,
    src: &mut Option<&[u32]>,
    state: &mut ConversionState,
) -> Result<usize> {
    let Some(input) = *src else {
        return Ok(0);
    };
    let count_only = dst.is_none();
    let limit = dst.as_ref().map_or(usize::MAX, |d| d.len());
    let mut buf = [0u8; MB_LEN_MAX];
    let mut written = 0usize;
    let mut idx = 0usize;

    while written < limit && idx < input.len() {
        let wc = input[idx];
        let before = *state;
        let n = match encode_char(encoding, &mut buf, wc, state) {
            Ok(n) => n,
            Err(err) => {
                state.reset();
                if !count_only {
                    *src = Some(&input[idx..]);
                }
                return Err(err);
            }
        };
        let Some(end) = written.checked_add(n).filter(|end| *end <= limit) else {
            *state = before;
            break;
        };
        if let Some(dst) = dst.as_deref_mut() {
            dst[written..end].copy_from_slice(&buf[..n]);
        }
        written = end;
        idx += 1;
        if wc == 0 {
            if !count_only {
                *src = None;
            }
            state.reset();
            return Ok(written - 1);
        }
    }

    if !count_only {
        *src = drained_cursor(&input[idx..], state);
    }
    Ok(written)
}

/// Length of the next character (`mbrlen`).
pub fn mbrlen(
    encoding: Encoding,
    src: &[u8],
    state: Option<&mut ConversionState>,
) -> Result<usize> {
    with_state(state, DefaultSlot::Mbrlen, |state| {
        decode_one_in(encoding, None, Some(src), state)
    })
}

/// Length of the next character using the hidden `mblen` state.
///
/// Any failure resets that state, as `mblen` does.
pub fn mblen(encoding: Encoding, src: Option<&[u8]>) -> Result<usize> {
    with_default_state(DefaultSlot::Mblen, |state| {
        let result = decode_one_in(encoding, None, src, state);
        if result.is_err() {
            state.reset();
        }
        result
    })
}

/// Decode a whole string from the initial state (`mbstowcs`).
pub fn mbstowcs(encoding: Encoding, dst: &mut [u32], src: &[u8]) -> Result<usize> {
    let mut state = ConversionState::new();
    decode_string_in(encoding, Some(dst), &mut Some(src), &mut state)
}

/// Encode a whole wide string from the initial state (`wcstombs`).
pub fn wcstombs(encoding: Encoding, dst: &mut [u8], src: &[u32]) -> Result<usize> {
    let mut state = ConversionState::new();
    encode_string_in(encoding, Some(dst), &mut Some(src), &mut state)
}

/// `mbsinit`: a missing state counts as initial.
#[must_use]
pub fn mbsinit(state: Option<&ConversionState>) -> bool {
    state.is_none_or(ConversionState::is_initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ESC: u8 = 0x1B;

    #[test]
    fn null_source_reports_statefulness_and_resets() {
        let mut st = ConversionState::new();
        assert_eq!(decode_one(Encoding::Utf8, None, Some(&[0xE4]), Some(&mut st)), Err(StdioError::IncompleteSequence));
        assert!(!st.is_initial());
        assert_eq!(decode_one(Encoding::Utf8, None, None, Some(&mut st)), Ok(0));
        assert!(st.is_initial());
        assert_eq!(decode_one(Encoding::Jis, None, None, Some(&mut st)), Ok(1));
    }

    #[test]
    fn zero_length_source_is_incomplete_and_leaves_state() {
        for enc in Encoding::ALL {
            let mut st = ConversionState::new();
            st.set_pending(&[0xE4]);
            let before = st;
            let mut wc = 7;
            assert_eq!(
                decode_one(enc, Some(&mut wc), Some(&[]), Some(&mut st)),
                Err(StdioError::IncompleteSequence)
            );
            assert_eq!(st, before);
            assert_eq!(wc, 7);
        }
    }

    #[test]
    fn terminator_writes_zero() {
        let mut wc = 99;
        assert_eq!(decode_one(Encoding::Utf8, Some(&mut wc), Some(b"\0abc"), None), Ok(0));
        assert_eq!(wc, 0);
    }

    #[test]
    fn invalid_leaves_output_and_state() {
        let mut st = ConversionState::new();
        let mut wc = 5;
        assert_eq!(
            decode_one(Encoding::Utf8, Some(&mut wc), Some(&[0xFF]), Some(&mut st)),
            Err(StdioError::InvalidSequence)
        );
        assert_eq!(wc, 5);
        assert!(st.is_initial());
    }

    #[test]
    fn implicit_state_carries_between_calls() {
        assert_eq!(decode_one(Encoding::Utf8, None, Some(&[0xC3]), None), Err(StdioError::IncompleteSequence));
        let mut wc = 0;
        assert_eq!(decode_one(Encoding::Utf8, Some(&mut wc), Some(&[0xA9]), None), Ok(1));
        assert_eq!(wc, 0xE9);
    }

    #[test]
    fn encode_one_probe_has_no_effect() {
        let mut st = ConversionState::new();
        assert_eq!(encode_one(Encoding::Jis, None, 0x3021, Some(&mut st)), Ok(5));
        assert!(st.is_initial());
        let mut buf = [0u8; 8];
        assert_eq!(encode_one(Encoding::Jis, Some(&mut buf), 0x3021, Some(&mut st)), Ok(5));
        assert!(!st.is_initial());
        assert_eq!(encode_one(Encoding::Jis, None, 0x3022, Some(&mut st)), Ok(2));
    }

    #[test]
    fn encode_one_short_destination() {
        let mut st = ConversionState::new();
        let mut buf = [0u8; 2];
        assert_eq!(
            encode_one(Encoding::Utf8, Some(&mut buf), 0x4E16, Some(&mut st)),
            Err(StdioError::InsufficientSpace { needed: 3 })
        );
        assert_eq!(buf, [0, 0]);
        assert_eq!(
            encode_one(Encoding::Ascii, Some(&mut buf), 0x4E16, Some(&mut st)),
            Err(StdioError::InvalidSequence)
        );
    }

    #[test]
    fn decode_string_empty_source() {
        let mut dst = [7u32; 4];
        let mut src: Option<&[u8]> = Some(b"\0");
        assert_eq!(decode_string(Encoding::Utf8, Some(&mut dst), &mut src, None), Ok(0));
        assert_eq!(dst[0], 0);
        assert_eq!(dst[1], 7);
        assert_eq!(src, None);
    }

    #[test]
    fn decode_string_stops_at_capacity() {
        let mut st = ConversionState::new();
        let mut dst = [0u32; 2];
        let text = "añb\0".as_bytes();
        let mut src = Some(text);
        assert_eq!(decode_string(Encoding::Utf8, Some(&mut dst), &mut src, Some(&mut st)), Ok(2));
        assert_eq!(dst, [u32::from(b'a'), 0xF1]);
        assert_eq!(src, Some(&text[3..]));
    }

    #[test]
    fn decode_string_failure_boundary() {
        let mut st = ConversionState::new();
        let mut dst = [0u32; 8];
        let bytes: &[u8] = &[b'o', b'k', 0xC3, 0xA9, 0xFF, b'x', 0];
        let mut src = Some(bytes);
        assert_eq!(
            decode_string(Encoding::Utf8, Some(&mut dst), &mut src, Some(&mut st)),
            Err(StdioError::InvalidSequence)
        );
        assert_eq!(&dst[..3], &[u32::from(b'o'), u32::from(b'k'), 0xE9]);
        assert_eq!(dst[3], 0);
        assert_eq!(src, Some(&bytes[4..]));
        assert!(st.is_initial());
    }

    #[test]
    fn decode_string_keeps_trailing_prefix() {
        let mut st = ConversionState::new();
        let mut dst = [0u32; 8];
        let bytes: &[u8] = &[b'a', 0xE4, 0xB8];
        let mut src = Some(bytes);
        assert_eq!(decode_string(Encoding::Utf8, Some(&mut dst), &mut src, Some(&mut st)), Ok(1));
        assert_eq!(src, Some(&bytes[3..]));
        assert_eq!(st.pending_len(), 2);

        let rest: &[u8] = &[0x96, 0];
        let mut src = Some(rest);
        assert_eq!(decode_string(Encoding::Utf8, Some(&mut dst), &mut src, Some(&mut st)), Ok(1));
        assert_eq!(dst[0], 0x4E16);
        assert_eq!(src, None);
    }

    #[test]
    fn drained_source_without_terminator_clears_cursor() {
        let mut dst = [0u32; 4];
        let mut src: Option<&[u8]> = Some(b"ab");
        assert_eq!(decode_string(Encoding::Utf8, Some(&mut dst), &mut src, None), Ok(2));
        assert_eq!(&dst[..2], &[u32::from(b'a'), u32::from(b'b')]);
        assert_eq!(src, None);

        let wide = [u32::from(b'a'), u32::from(b'b')];
        let mut src: Option<&[u32]> = Some(&wide);
        let mut out = [0u8; 8];
        assert_eq!(encode_string(Encoding::Utf8, Some(&mut out), &mut src, None), Ok(2));
        assert_eq!(&out[..2], b"ab");
        assert_eq!(src, None);
    }

    #[test]
    fn drained_source_in_shifted_state_keeps_empty_cursor() {
        let mut st = ConversionState::new();
        let wide = [0x3021u32];
        let mut src: Option<&[u32]> = Some(&wide);
        let mut out = [0u8; 8];
        assert_eq!(encode_string(Encoding::Jis, Some(&mut out), &mut src, Some(&mut st)), Ok(5));
        assert_eq!(src, Some(&wide[1..]));
        assert!(!st.is_initial());

        let mut st = ConversionState::new();
        let bytes: &[u8] = &[ESC, b'$', b'B', 0x30, 0x21];
        let mut src = Some(bytes);
        let mut dst = [0u32; 4];
        assert_eq!(decode_string(Encoding::Jis, Some(&mut dst), &mut src, Some(&mut st)), Ok(1));
        assert_eq!(src, Some(&bytes[5..]));
    }

    #[test]
    fn decode_string_count_only_keeps_cursor() {
        let text: &[u8] = "日本語\0".as_bytes();
        let mut src = Some(text);
        assert_eq!(decode_string(Encoding::Utf8, None, &mut src, Some(&mut ConversionState::new())), Ok(3));
        assert_eq!(src, Some(text));
    }

    #[test]
    fn encode_string_excludes_terminator() {
        let wide = [u32::from(b'h'), 0xE9, 0];
        let mut src: Option<&[u32]> = Some(&wide);
        let mut dst = [0xAAu8; 8];
        assert_eq!(encode_string(Encoding::Utf8, Some(&mut dst), &mut src, None), Ok(3));
        assert_eq!(&dst[..4], &[b'h', 0xC3, 0xA9, 0]);
        assert_eq!(src, None);
    }

    #[test]
    fn encode_string_never_splits_a_character() {
        let wide = [u32::from(b'a'), 0x4E16, 0];
        let mut src: Option<&[u32]> = Some(&wide);
        let mut dst = [0u8; 3];
        assert_eq!(encode_string(Encoding::Utf8, Some(&mut dst), &mut src, None), Ok(1));
        assert_eq!(src, Some(&wide[1..]));
    }

    #[test]
    fn encode_string_rolls_back_shift_when_full() {
        let wide = [u32::from(b'a'), 0x3021, 0];
        let mut st = ConversionState::new();
        let mut src: Option<&[u32]> = Some(&wide);
        let mut dst = [0u8; 4];
        assert_eq!(encode_string(Encoding::Jis, Some(&mut dst), &mut src, Some(&mut st)), Ok(1));
        assert!(st.is_initial());
        assert_eq!(src, Some(&wide[1..]));
    }

    #[test]
    fn encode_string_failure_boundary() {
        let wide = [u32::from(b'o'), u32::from(b'k'), 0xD800, u32::from(b'x'), 0];
        let mut src: Option<&[u32]> = Some(&wide);
        let mut dst = [0u8; 8];
        assert_eq!(
            encode_string(Encoding::Utf8, Some(&mut dst), &mut src, None),
            Err(StdioError::InvalidSequence)
        );
        assert_eq!(&dst[..2], b"ok");
        assert_eq!(src, Some(&wide[2..]));
    }

    #[test]
    fn jis_string_round_trip_resets_shift() {
        let bytes: &[u8] = &[b'x', ESC, b'$', b'B', 0x30, 0x21, ESC, b'(', b'B', 0];
        let mut wide = [0u32; 4];
        assert_eq!(mbstowcs(Encoding::Jis, &mut wide, bytes), Ok(2));
        assert_eq!(&wide[..3], &[u32::from(b'x'), 0x3021, 0]);

        let mut out = [0u8; 16];
        assert_eq!(wcstombs(Encoding::Jis, &mut out, &wide), Ok(9));
        assert_eq!(&out[..10], bytes);
    }

    #[test]
    fn mblen_resets_after_failure() {
        assert_eq!(mblen(Encoding::ShiftJis, Some(&[0x93])), Err(StdioError::IncompleteSequence));
        assert!(with_default_state(DefaultSlot::Mblen, |st| st.is_initial()));
        assert_eq!(mblen(Encoding::ShiftJis, Some(&[0x93, 0xFA])), Ok(2));
        assert_eq!(mblen(Encoding::Jis, None), Ok(1));
    }

    #[test]
    fn mbrlen_uses_its_own_state() {
        let mut st = ConversionState::new();
        assert_eq!(mbrlen(Encoding::EucJp, &[0x8F, 0xB0], Some(&mut st)), Err(StdioError::IncompleteSequence));
        assert!(!mbsinit(Some(&st)));
        assert_eq!(mbrlen(Encoding::EucJp, &[0xA1], Some(&mut st)), Ok(1));
        assert!(mbsinit(Some(&st)));
        assert!(mbsinit(None));
    }

    fn single_byte_safe(enc: Encoding) -> std::ops::RangeInclusive<u8> {
        match enc {
            Encoding::Latin1 => 1..=0xFF,
            _ => 1..=0x7F,
        }
    }

    proptest! {
        #[test]
        fn prop_single_byte_round_trip(idx in 0usize..6, byte in any::<u8>()) {
            let enc = Encoding::ALL[idx];
            prop_assume!(single_byte_safe(enc).contains(&byte) && byte != ESC);
            let mut wc = 0;
            let mut st = ConversionState::new();
            prop_assert_eq!(decode_one(enc, Some(&mut wc), Some(&[byte]), Some(&mut st)), Ok(1));
            let mut out = [0u8; MB_LEN_MAX];
            let mut st = ConversionState::new();
            prop_assert_eq!(encode_one(enc, Some(&mut out), wc, Some(&mut st)), Ok(1));
            prop_assert_eq!(out[0], byte);
        }

        #[test]
        fn prop_eucjp_pairs_round_trip(hi in 0xA1u8..=0xFE, lo in 0xA1u8..=0xFE) {
            let mut wc = 0;
            let mut st = ConversionState::new();
            prop_assert_eq!(decode_one(Encoding::EucJp, Some(&mut wc), Some(&[hi, lo]), Some(&mut st)), Ok(2));
            let mut out = [0u8; MB_LEN_MAX];
            prop_assert_eq!(encode_one(Encoding::EucJp, Some(&mut out), wc, Some(&mut st)), Ok(2));
            prop_assert_eq!(&out[..2], &[hi, lo]);
        }

        #[test]
        fn prop_utf8_string_matches_std(text in "[^\\x00]{0,24}") {
            let mut bytes = text.clone().into_bytes();
            bytes.push(0);
            let mut wide = vec![0u32; text.chars().count() + 1];
            prop_assert_eq!(mbstowcs(Encoding::Utf8, &mut wide, &bytes), Ok(text.chars().count()));
            let expected: Vec<u32> = text.chars().map(|c| c as u32).collect();
            prop_assert_eq!(&wide[..expected.len()], &expected[..]);

            let mut back = vec![0u8; bytes.len()];
            prop_assert_eq!(wcstombs(Encoding::Utf8, &mut back, &wide), Ok(text.len()));
            prop_assert_eq!(back, bytes);
        }
    }
}
