//! Single-byte encodings: ASCII (the C locale) and ISO-8859-1.

use crate::error::{Result, StdioError};

pub(super) fn decode_ascii(out: &mut u32, src: &[u8]) -> Result<usize> {
    match src[0] {
        0 => {
            *out = 0;
            Ok(0)
        }
        b @ 0x01..=0x7F => {
            *out = u32::from(b);
            Ok(1)
        }
        _ => Err(StdioError::InvalidSequence),
    }
}

pub(super) fn encode_ascii(buf: &mut [u8], wc: u32) -> Result<usize> {
    if wc > 0x7F {
        return Err(StdioError::InvalidSequence);
    }
    buf[0] = wc as u8;
    Ok(1)
}

pub(super) fn decode_latin1(out: &mut u32, src: &[u8]) -> Result<usize> {
    *out = u32::from(src[0]);
    Ok(usize::from(src[0] != 0))
}

pub(super) fn encode_latin1(buf: &mut [u8], wc: u32) -> Result<usize> {
    if wc > 0xFF {
        return Err(StdioError::InvalidSequence);
    }
    buf[0] = wc as u8;
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut wc = 0;
        assert_eq!(decode_ascii(&mut wc, b"A"), Ok(1));
        assert_eq!(wc, 0x41);
        assert_eq!(decode_ascii(&mut wc, &[0x80]), Err(StdioError::InvalidSequence));
        assert_eq!(wc, 0x41);
        assert_eq!(encode_ascii(&mut [0u8; 1], 0xE9), Err(StdioError::InvalidSequence));
    }

    #[test]
    fn latin1_maps_every_byte() {
        let mut wc = 0;
        for b in 1..=0xFFu8 {
            assert_eq!(decode_latin1(&mut wc, &[b]), Ok(1));
            let mut buf = [0u8; 1];
            assert_eq!(encode_latin1(&mut buf, wc), Ok(1));
            assert_eq!(buf[0], b);
        }
        assert_eq!(decode_latin1(&mut wc, &[0]), Ok(0));
        assert_eq!(wc, 0);
        assert_eq!(encode_latin1(&mut [0u8; 1], 0x100), Err(StdioError::InvalidSequence));
    }
}
