//! Unsigned little-endian integer codecs over fixed-width index rows.
//!
//! Every on-disk integer in a module, from index row offsets to blob
//! locators, is unsigned little-endian. Rows are
//! fixed-width, so callers slice a whole row first and decode fields at
//! known offsets within it; offsets here are trusted to be in bounds.

/// Decode an unsigned 16-bit little-endian value at `offset`.
#[inline]
pub fn decode_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Decode an unsigned 32-bit little-endian value at `offset`.
#[inline]
pub fn decode_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Encode `value` as 2 little-endian bytes at `offset`.
#[inline]
pub fn encode_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Encode `value` as 4 little-endian bytes at `offset`.
#[inline]
pub fn encode_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Position of the first occurrence of `sought` in `buf`, if any.
#[inline]
pub fn find_byte(buf: &[u8], sought: u8) -> Option<usize> {
    buf.iter().position(|&b| b == sought)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_round_trip() {
        let mut buf = [0u8; 4];
        encode_u16_le(&mut buf, 1, 0xBEEF);
        assert_eq!(buf, [0x00, 0xEF, 0xBE, 0x00]);
        assert_eq!(decode_u16_le(&buf, 1), 0xBEEF);
    }

    #[test]
    fn test_u32_round_trip() {
        let mut buf = [0u8; 6];
        encode_u32_le(&mut buf, 2, 0xDEAD_BEEF);
        assert_eq!(buf, [0x00, 0x00, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(decode_u32_le(&buf, 2), 0xDEAD_BEEF);
    }

    #[test]
    fn test_decode_is_unsigned() {
        // High bit set in every byte must not sign-extend.
        let buf = [0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(decode_u16_le(&buf, 0), 0xFFFF);
        assert_eq!(decode_u32_le(&buf, 0), 0xFFFF_FFFF);
    }

    #[test]
    fn test_find_byte() {
        let buf = b"key\ntext";
        assert_eq!(find_byte(buf, b'\n'), Some(3));
        assert_eq!(find_byte(buf, b'k'), Some(0));
        assert_eq!(find_byte(buf, b'\0'), None);
        assert_eq!(find_byte(&[], b'x'), None);
    }
}
