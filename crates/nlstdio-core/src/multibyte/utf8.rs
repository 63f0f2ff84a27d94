//! UTF-8, restartable across calls.
//!
//! Every byte is vetted as soon as it is seen, so overlong forms,
//! surrogates and values above U+10FFFF are rejected even when the
//! sequence arrives split over several calls.

use super::state::{Assembler, ConversionState};
use crate::error::{Result, StdioError};

/// Sequence length announced by a lead byte, or `None` for bytes that can
/// never start a character (continuations, `0xC0`, `0xC1`, `0xF5..`).
fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn valid_continuation(lead: u8, position: usize, b: u8) -> bool {
    if b & 0xC0 != 0x80 {
        return false;
    }
    if position != 1 {
        return true;
    }
    match lead {
        0xE0 => b >= 0xA0,
        0xED => b <= 0x9F,
        0xF0 => b >= 0x90,
        0xF4 => b <= 0x8F,
        _ => true,
    }
}

pub(super) fn decode(out: &mut u32, src: &[u8], state: &mut ConversionState) -> Result<usize> {
    let mut asm = Assembler::resume(state, src);
    let fresh = asm.is_fresh();
    let Some(lead) = asm.lead() else {
        return Err(StdioError::IncompleteSequence);
    };
    if fresh && lead < 0x80 {
        *out = u32::from(lead);
        return Ok(usize::from(lead != 0));
    }
    let need = sequence_len(lead).ok_or(StdioError::InvalidSequence)?;
    let seq = asm.complete(need, state, |pos, b| valid_continuation(lead, pos, b))?;

    let mut wc = u32::from(lead) & (0x7F >> need);
    for &b in &seq[1..need] {
        wc = (wc << 6) | u32::from(b & 0x3F);
    }
    *out = wc;
    Ok(asm.used())
}

pub(super) fn encode(buf: &mut [u8], wc: u32) -> Result<usize> {
    if (0xD800..=0xDFFF).contains(&wc) || wc > 0x10FFFF {
        return Err(StdioError::InvalidSequence);
    }
    if wc < 0x80 {
        buf[0] = wc as u8;
        Ok(1)
    } else if wc < 0x800 {
        buf[0] = 0xC0 | (wc >> 6) as u8;
        buf[1] = 0x80 | (wc & 0x3F) as u8;
        Ok(2)
    } else if wc < 0x10000 {
        buf[0] = 0xE0 | (wc >> 12) as u8;
        buf[1] = 0x80 | ((wc >> 6) & 0x3F) as u8;
        buf[2] = 0x80 | (wc & 0x3F) as u8;
        Ok(3)
    } else {
        buf[0] = 0xF0 | (wc >> 18) as u8;
        buf[1] = 0x80 | ((wc >> 12) & 0x3F) as u8;
        buf[2] = 0x80 | ((wc >> 6) & 0x3F) as u8;
        buf[3] = 0x80 | (wc & 0x3F) as u8;
        Ok(4)
    }
}
