//! Charset resolution and payload decoding.
//!
//! Modules declare their text encoding in metadata; in practice only two
//! occur: UTF-8 and the legacy single-byte Latin-1, which is decoded as
//! Windows-1252 (the superset real modules were authored in). Legacy
//! payloads are scrubbed before decoding: raw control bytes other than
//! tab/LF/CR, and the five code points cp1252 leaves undefined, are
//! replaced with a space so a stray byte cannot poison the whole record.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::warn;

/// Text encoding of a module's record payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// Declared `Latin-1`, decoded as Windows-1252.
    #[default]
    Latin1,
}

impl Charset {
    /// Resolve a declared encoding name. Undeclared and unrecognized names
    /// fall back to [`Charset::Latin1`], the historical module default.
    pub fn resolve(declared: Option<&str>) -> Charset {
        let Some(name) = declared else {
            return Charset::Latin1;
        };
        match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Charset::Utf8,
            "LATIN-1" | "LATIN1" | "ISO-8859-1" | "WINDOWS-1252" | "CP1252" => Charset::Latin1,
            other => {
                warn!(charset = other, "unknown module charset, assuming Latin-1");
                Charset::Latin1
            }
        }
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            Charset::Utf8 => UTF_8,
            Charset::Latin1 => WINDOWS_1252,
        }
    }

    /// Decode `bytes` to text. Malformed sequences become U+FFFD; for the
    /// legacy charset the input is scrubbed first (see [`clean1252`]).
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => self.encoding().decode(bytes).0.into_owned(),
            Charset::Latin1 => {
                if bytes.iter().any(|&b| is_dirty_1252(b)) {
                    let mut owned = bytes.to_vec();
                    clean1252(&mut owned);
                    self.encoding().decode(&owned).0.into_owned()
                } else {
                    self.encoding().decode(bytes).0.into_owned()
                }
            }
        }
    }
}

fn is_dirty_1252(b: u8) -> bool {
    (b < 0x20 && b != 0x09 && b != 0x0A && b != 0x0D)
        || matches!(b, 0x81 | 0x8D | 0x8F | 0x90 | 0x9D)
}

/// Replace bytes Windows-1252 cannot represent with a space, in place.
///
/// Covers C0 controls other than tab/LF/CR and the five undefined
/// cp1252 positions (0x81, 0x8D, 0x8F, 0x90, 0x9D).
pub fn clean1252(data: &mut [u8]) {
    for (i, b) in data.iter_mut().enumerate() {
        if is_dirty_1252(*b) {
            warn!(byte = format!("0x{:02X}", *b), position = i, "bad legacy byte replaced");
            *b = 0x20;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_names() {
        assert_eq!(Charset::resolve(Some("UTF-8")), Charset::Utf8);
        assert_eq!(Charset::resolve(Some("utf8")), Charset::Utf8);
        assert_eq!(Charset::resolve(Some("Latin-1")), Charset::Latin1);
        assert_eq!(Charset::resolve(Some("WINDOWS-1252")), Charset::Latin1);
        assert_eq!(Charset::resolve(None), Charset::Latin1);
        // Unknown names degrade to the legacy default rather than failing.
        assert_eq!(Charset::resolve(Some("KOI8-R")), Charset::Latin1);
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(Charset::Utf8.decode("λόγος".as_bytes()), "λόγος");
    }

    #[test]
    fn test_decode_cp1252_smart_quotes() {
        // 0x93/0x94 are curly quotes in cp1252, undefined in ISO-8859-1.
        assert_eq!(Charset::Latin1.decode(&[0x93, 0x41, 0x94]), "\u{201C}A\u{201D}");
    }

    #[test]
    fn test_clean1252_scrubs_controls_and_holes() {
        let mut data = [0x01, b'a', 0x81, b'b', 0x9D, 0x09, 0x0A, 0x0D];
        clean1252(&mut data);
        assert_eq!(data, [0x20, b'a', 0x20, b'b', 0x20, 0x09, 0x0A, 0x0D]);
    }

    #[test]
    fn test_decode_latin1_scrubs_before_decoding() {
        assert_eq!(Charset::Latin1.decode(&[b'x', 0x8F, b'y']), "x y");
        // Tab and newline survive the scrub.
        assert_eq!(Charset::Latin1.decode(b"a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn test_decode_utf8_never_scrubbed() {
        // UTF-8 modules carry control bytes through untouched.
        assert_eq!(Charset::Utf8.decode(&[0x01, b'a']), "\u{1}a");
    }
}
