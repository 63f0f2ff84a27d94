//! Japanese encodings: EUC-JP, Shift_JIS and ISO-2022-JP.
//!
//! Wide values are encoding-defined rather than Unicode: a two-byte
//! character becomes `(first << 8) | second`. EUC-JP three-byte (JIS X 0212)
//! characters keep their last two bytes with the high bit of the final byte
//! cleared, which keeps them distinct from JIS X 0208 pairs.

use super::state::{Assembler, ConversionState, Shift};
use crate::error::{Result, StdioError};

const ESC: u8 = 0x1B;

fn is_euc_byte(b: u8) -> bool {
    (0xA1..=0xFE).contains(&b)
}

fn is_sjis_lead(b: u8) -> bool {
    (0x81..=0x9F).contains(&b) || (0xE0..=0xEF).contains(&b)
}

fn is_sjis_trail(b: u8) -> bool {
    (0x40..=0x7E).contains(&b) || (0x80..=0xFC).contains(&b)
}

fn is_sjis_kana(b: u8) -> bool {
    (0xA1..=0xDF).contains(&b)
}

fn is_jis_byte(b: u8) -> bool {
    (0x21..=0x7E).contains(&b)
}

fn pair(hi: u8, lo: u8) -> u32 {
    (u32::from(hi) << 8) | u32::from(lo)
}

pub(super) fn decode_eucjp(out: &mut u32, src: &[u8], state: &mut ConversionState) -> Result<usize> {
    let mut asm = Assembler::resume(state, src);
    let fresh = asm.is_fresh();
    let Some(lead) = asm.lead() else {
        return Err(StdioError::IncompleteSequence);
    };
    if fresh && lead < 0x80 {
        *out = u32::from(lead);
        return Ok(usize::from(lead != 0));
    }
    let need = match lead {
        0x8E => 2,
        0x8F => 3,
        b if is_euc_byte(b) => 2,
        _ => return Err(StdioError::InvalidSequence),
    };
    let seq = asm.complete(need, state, |_, b| is_euc_byte(b))?;
    *out = if lead == 0x8F {
        pair(seq[1], seq[2] & 0x7F)
    } else {
        pair(seq[0], seq[1])
    };
    Ok(asm.used())
}

pub(super) fn encode_eucjp(buf: &mut [u8], wc: u32) -> Result<usize> {
    if wc < 0x80 {
        buf[0] = wc as u8;
        return Ok(1);
    }
    if wc > 0xFFFF {
        return Err(StdioError::InvalidSequence);
    }
    let (c1, c2) = ((wc >> 8) as u8, wc as u8);
    if (c1 == 0x8E || is_euc_byte(c1)) && is_euc_byte(c2) {
        buf[0] = c1;
        buf[1] = c2;
        Ok(2)
    } else if is_euc_byte(c1) && is_jis_byte(c2) {
        buf[0] = 0x8F;
        buf[1] = c1;
        buf[2] = c2 | 0x80;
        Ok(3)
    } else {
        Err(StdioError::InvalidSequence)
    }
}

pub(super) fn decode_sjis(out: &mut u32, src: &[u8], state: &mut ConversionState) -> Result<usize> {
    let mut asm = Assembler::resume(state, src);
    let fresh = asm.is_fresh();
    let Some(lead) = asm.lead() else {
        return Err(StdioError::IncompleteSequence);
    };
    if fresh && (lead < 0x80 || is_sjis_kana(lead)) {
        *out = u32::from(lead);
        return Ok(usize::from(lead != 0));
    }
    if !is_sjis_lead(lead) {
        return Err(StdioError::InvalidSequence);
    }
    let seq = asm.complete(2, state, |_, b| is_sjis_trail(b))?;
    *out = pair(seq[0], seq[1]);
    Ok(asm.used())
}

pub(super) fn encode_sjis(buf: &mut [u8], wc: u32) -> Result<usize> {
    if wc <= 0xFF {
        let b = wc as u8;
        if b < 0x80 || is_sjis_kana(b) {
            buf[0] = b;
            return Ok(1);
        }
        return Err(StdioError::InvalidSequence);
    }
    if wc > 0xFFFF {
        return Err(StdioError::InvalidSequence);
    }
    let (c1, c2) = ((wc >> 8) as u8, wc as u8);
    if !is_sjis_lead(c1) || !is_sjis_trail(c2) {
        return Err(StdioError::InvalidSequence);
    }
    buf[0] = c1;
    buf[1] = c2;
    Ok(2)
}

/// Shift selected by the escape sequence `ESC seq[1] seq[2]`.
fn escape_target(seq: &[u8]) -> Option<Shift> {
    match (seq[1], seq[2]) {
        (b'$', b'B' | b'@') => Some(Shift::Jis0208),
        (b'(', b'B' | b'J') => Some(Shift::Ascii),
        _ => None,
    }
}

pub(super) fn decode_jis(out: &mut u32, src: &[u8], state: &mut ConversionState) -> Result<usize> {
    let mut asm = Assembler::resume(state, src);
    loop {
        let fresh = asm.is_fresh();
        let Some(lead) = asm.lead() else {
            // Only shift sequences so far; they are consumed, the character is not.
            return Err(StdioError::IncompleteSequence);
        };

        if lead == ESC {
            let seq = asm.complete(3, state, |pos, b| match pos {
                1 => b == b'$' || b == b'(',
                _ => b.is_ascii_uppercase() || b == b'@',
            })?;
            let shift = escape_target(&seq).ok_or(StdioError::InvalidSequence)?;
            log::trace!("jis shift -> {shift:?}");
            state.set_shift(shift);
            asm.restart();
            continue;
        }

        if fresh && lead == 0 {
            state.reset();
            *out = 0;
            return Ok(0);
        }

        return match state.shift() {
            Shift::Ascii if lead < 0x80 => {
                *out = u32::from(lead);
                Ok(asm.used())
            }
            Shift::Jis0208 if is_jis_byte(lead) => {
                let seq = asm.complete(2, state, |_, b| is_jis_byte(b))?;
                *out = pair(seq[0], seq[1]);
                Ok(asm.used())
            }
            _ => Err(StdioError::InvalidSequence),
        };
    }
}

pub(super) fn encode_jis(buf: &mut [u8], wc: u32, state: &mut ConversionState) -> Result<usize> {
    let mut n = 0;
    if wc < 0x80 {
        if state.shift() != Shift::Ascii {
            buf[..3].copy_from_slice(&[ESC, b'(', b'B']);
            n = 3;
            state.set_shift(Shift::Ascii);
        }
        buf[n] = wc as u8;
        return Ok(n + 1);
    }
    if wc > 0xFFFF {
        return Err(StdioError::InvalidSequence);
    }
    let (c1, c2) = ((wc >> 8) as u8, wc as u8);
    if !is_jis_byte(c1) || !is_jis_byte(c2) {
        return Err(StdioError::InvalidSequence);
    }
    if state.shift() != Shift::Jis0208 {
        buf[..3].copy_from_slice(&[ESC, b'$', b'B']);
        n = 3;
        state.set_shift(Shift::Jis0208);
    }
    buf[n] = c1;
    buf[n + 1] = c2;
    Ok(n + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eucjp_forms() {
        let mut st = ConversionState::new();
        let mut wc = 0;
        assert_eq!(decode_eucjp(&mut wc, &[0xC6, 0xFC], &mut st), Ok(2));
        assert_eq!(wc, 0xC6FC);
        assert_eq!(decode_eucjp(&mut wc, &[0x8E, 0xB1], &mut st), Ok(2));
        assert_eq!(wc, 0x8EB1);
        assert_eq!(decode_eucjp(&mut wc, &[0x8F, 0xB0, 0xA1], &mut st), Ok(3));
        assert_eq!(wc, 0xB021);

        let mut buf = [0u8; 3];
        assert_eq!(encode_eucjp(&mut buf, 0xB021), Ok(3));
        assert_eq!(buf, [0x8F, 0xB0, 0xA1]);
        assert_eq!(encode_eucjp(&mut buf, 0x8EB1), Ok(2));
        assert_eq!(&buf[..2], &[0x8E, 0xB1]);
        assert_eq!(encode_eucjp(&mut buf, 0x00E9), Err(StdioError::InvalidSequence));
    }

    #[test]
    fn eucjp_rejects_stray_high_bytes() {
        let mut st = ConversionState::new();
        let mut wc = 0;
        assert_eq!(decode_eucjp(&mut wc, &[0x80], &mut st), Err(StdioError::InvalidSequence));
        assert_eq!(decode_eucjp(&mut wc, &[0xC6, 0x41], &mut st), Err(StdioError::InvalidSequence));
        assert!(st.is_initial());
    }

    #[test]
    fn sjis_forms() {
        let mut st = ConversionState::new();
        let mut wc = 0;
        assert_eq!(decode_sjis(&mut wc, &[0x93, 0xFA], &mut st), Ok(2));
        assert_eq!(wc, 0x93FA);
        assert_eq!(decode_sjis(&mut wc, &[0xB1], &mut st), Ok(1));
        assert_eq!(wc, 0xB1);
        assert_eq!(decode_sjis(&mut wc, &[0x93], &mut st), Err(StdioError::IncompleteSequence));
        assert_eq!(decode_sjis(&mut wc, &[0xFA], &mut st), Ok(1));
        assert_eq!(wc, 0x93FA);
        assert_eq!(encode_sjis(&mut [0u8; 2], 0x80), Err(StdioError::InvalidSequence));
    }

    #[test]
    fn jis_shift_sequences() {
        let mut st = ConversionState::new();
        let mut wc = 0;
        let src = [ESC, b'$', b'B', 0x46, 0x7C, 0x4B, 0x5C, ESC, b'(', b'B', b'a', 0];
        assert_eq!(decode_jis(&mut wc, &src, &mut st), Ok(5));
        assert_eq!(wc, 0x467C);
        assert_eq!(st.shift(), Shift::Jis0208);
        assert_eq!(decode_jis(&mut wc, &src[5..], &mut st), Ok(2));
        assert_eq!(wc, 0x4B5C);
        assert_eq!(decode_jis(&mut wc, &src[7..], &mut st), Ok(4));
        assert_eq!(wc, u32::from(b'a'));
        assert_eq!(decode_jis(&mut wc, &src[11..], &mut st), Ok(0));
        assert!(st.is_initial());
    }

    #[test]
    fn jis_escape_split_over_calls() {
        let mut st = ConversionState::new();
        let mut wc = 0;
        assert_eq!(decode_jis(&mut wc, &[ESC, b'$'], &mut st), Err(StdioError::IncompleteSequence));
        assert_eq!(st.pending(), &[ESC, b'$']);
        assert_eq!(decode_jis(&mut wc, &[b'B'], &mut st), Err(StdioError::IncompleteSequence));
        assert_eq!(st.shift(), Shift::Jis0208);
        assert_eq!(st.pending_len(), 0);
        assert_eq!(decode_jis(&mut wc, &[0x30, 0x21], &mut st), Ok(2));
        assert_eq!(wc, 0x3021);
    }

    #[test]
    fn jis_encode_emits_shifts() {
        let mut st = ConversionState::new();
        let mut buf = [0u8; 8];
        assert_eq!(encode_jis(&mut buf, 0x467C, &mut st), Ok(5));
        assert_eq!(&buf[..5], &[ESC, b'$', b'B', 0x46, 0x7C]);
        assert_eq!(encode_jis(&mut buf, 0x4B5C, &mut st), Ok(2));
        assert_eq!(encode_jis(&mut buf, 0, &mut st), Ok(4));
        assert_eq!(&buf[..4], &[ESC, b'(', b'B', 0]);
        assert!(st.is_initial());
        assert_eq!(encode_jis(&mut buf, 0x7F21, &mut st), Err(StdioError::InvalidSequence));
    }
}
