//! Index rows and data records.
//!
//! A `DataIndex` is one fixed-width index-table row: an `{offset, size}`
//! pointer into a data file. A `DataEntry` is the record that pointer leads
//! to, split into a key span and a payload:
//!
//! ```text
//! key bytes ... ['\\'] ['\r'] '\n' payload bytes ...
//! ```
//!
//! The payload is ordinary text, an `@LINK` alias naming another key to
//! resolve instead, or (for tree-indexed books and block-compressed
//! dictionaries) an 8-byte `{u32, u32}` locator. Entries are built fresh per
//! lookup and own their buffer; deciphering consumes the entry so a record
//! can never be deciphered twice.

use lectern_core::bytes::{decode_u16_le, decode_u32_le, find_byte};
use lectern_core::Charset;
use lectern_crypto::decipher_in_place;

use crate::module_file::ModuleFile;

/// Token opening an alias payload.
const LINK_TOKEN: &[u8] = b"@LINK";

/// One index-table row: a pointer into a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataIndex {
    pub offset: u32,
    pub size: u32,
}

impl DataIndex {
    pub fn new(offset: u32, size: u32) -> DataIndex {
        DataIndex { offset, size }
    }

    /// Row `row` of an index file whose rows are a `u32` offset followed by
    /// a size of `datasize` bytes (2 or 4). Rows the file does not cover
    /// decode as `{0, 0}`.
    pub(crate) fn read_row(file: &ModuleFile, row: u32, datasize: u8) -> DataIndex {
        let entry_size = 4 + datasize as usize;
        let buf = file.read_at(row as usize * entry_size, entry_size);
        if buf.len() < entry_size {
            return DataIndex::new(0, 0);
        }
        let size = match datasize {
            2 => u32::from(decode_u16_le(&buf, 4)),
            _ => decode_u32_le(&buf, 4),
        };
        DataIndex::new(decode_u32_le(&buf, 0), size)
    }
}

/// One decoded key/payload record.
pub struct DataEntry {
    data: Vec<u8>,
    key_len: usize,
    payload_start: usize,
    charset: Charset,
}

impl DataEntry {
    /// Split a raw record at its first `'\n'`. The key span drops one
    /// trailing `'\r'` and then one trailing `'\\'` (some modules pad
    /// dictionary keys with a stray backslash). A record with no separator
    /// at all is tolerated as an empty key with the whole buffer as payload.
    pub fn parse(data: Vec<u8>, charset: Charset) -> DataEntry {
        let (key_len, payload_start) = match find_byte(&data, b'\n') {
            Some(nl) => {
                let mut end = nl;
                if end > 0 && data[end - 1] == b'\r' {
                    end -= 1;
                }
                if end > 0 && data[end - 1] == b'\\' {
                    end -= 1;
                }
                (end, nl + 1)
            }
            None => (0, 0),
        };
        DataEntry {
            data,
            key_len,
            payload_start,
            charset,
        }
    }

    /// The record's own key, decoded and trimmed.
    pub fn key(&self) -> String {
        self.charset.decode(&self.data[..self.key_len]).trim().to_string()
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[self.payload_start..]
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len() - self.payload_start
    }

    /// Whether the payload redirects to another key instead of holding text.
    pub fn is_link_entry(&self) -> bool {
        self.payload().starts_with(LINK_TOKEN)
    }

    /// The key an alias record points at: the text following the `@LINK`
    /// token up to the next line break, trimmed.
    pub fn link_target(&self) -> String {
        let payload = self.payload();
        let rest = &payload[LINK_TOKEN.len().min(payload.len())..];
        let text = self.charset.decode(rest);
        let target = text.trim_start();
        let end = target.find('\n').unwrap_or(target.len());
        target[..end].trim().to_string()
    }

    /// The payload as text: deciphered in place when the module carries a
    /// cipher key, decoded with the module's charset, trimmed.
    pub fn raw_text(mut self, cipher_key: Option<&[u8]>) -> String {
        let start = self.payload_start;
        if let Some(key) = cipher_key {
            decipher_in_place(key, &mut self.data[start..]);
        }
        self.charset.decode(&self.data[start..]).trim().to_string()
    }

    /// Reinterpret the first 8 payload bytes as an `{offset, size}` pair.
    /// Used by tree-book leaves (a span in the blob file) and compressed
    /// dictionaries (block number and in-block entry index).
    pub fn block_locator(&self) -> Option<DataIndex> {
        let payload = self.payload();
        if payload.len() < 8 {
            return None;
        }
        Some(DataIndex::new(
            decode_u32_le(payload, 0),
            decode_u32_le(payload, 4),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::bytes::encode_u32_le;
    use lectern_crypto::encipher_in_place;

    fn make_entry(raw: &[u8]) -> DataEntry {
        DataEntry::parse(raw.to_vec(), Charset::Utf8)
    }

    #[test]
    fn test_parse_key_and_payload() {
        let entry = make_entry(b"Aaron\nA brother of Moses");
        assert_eq!(entry.key(), "Aaron");
        assert_eq!(entry.payload(), b"A brother of Moses");
        assert_eq!(entry.size(), 18);
    }

    #[test]
    fn test_parse_trims_cr_and_backslash() {
        assert_eq!(make_entry(b"Aaron\r\ntext").key(), "Aaron");
        assert_eq!(make_entry(b"Aaron\\\ntext").key(), "Aaron");
        assert_eq!(make_entry(b"Aaron\\\r\ntext").key(), "Aaron");
    }

    #[test]
    fn test_parse_without_separator() {
        let entry = make_entry(b"no separator here");
        assert_eq!(entry.key(), "");
        assert_eq!(entry.payload(), b"no separator here");
    }

    #[test]
    fn test_link_entry() {
        let entry = make_entry(b"Abram\n@LINK\nAbraham\n");
        assert!(entry.is_link_entry());
        assert_eq!(entry.link_target(), "Abraham");

        let inline = make_entry(b"Abram\n@LINK Abraham");
        assert!(inline.is_link_entry());
        assert_eq!(inline.link_target(), "Abraham");

        assert!(!make_entry(b"Abram\nplain text").is_link_entry());
    }

    #[test]
    fn test_raw_text_plain_and_trimmed() {
        let entry = make_entry(b"Gen 1:1\nIn the beginning  \r\n");
        assert_eq!(entry.raw_text(None), "In the beginning");
    }

    #[test]
    fn test_raw_text_deciphers() {
        let key = b"sekrit";
        let mut record = b"Gen 1:1\nIn the beginning".to_vec();
        encipher_in_place(key, &mut record[8..]);
        let entry = DataEntry::parse(record, Charset::Utf8);
        assert_eq!(entry.raw_text(Some(key)), "In the beginning");
    }

    #[test]
    fn test_block_locator() {
        let mut record = b"key\n".to_vec();
        let mut locator = [0u8; 8];
        encode_u32_le(&mut locator, 0, 7);
        encode_u32_le(&mut locator, 4, 3);
        record.extend_from_slice(&locator);
        let entry = DataEntry::parse(record, Charset::Latin1);
        assert_eq!(entry.block_locator(), Some(DataIndex::new(7, 3)));

        assert!(make_entry(b"key\nabc").block_locator().is_none());
    }
}
