//! Block-compressed per-testament verse storage.
//!
//! Verses are grouped into blocks (a book, chapter, or verse per block) and
//! each block is compressed whole. Three files per testament:
//!
//! ```text
//! ot.bzv   10-byte rows per ordinal: {block: u32, start: u32, size: u16}
//! ot.bzs   12-byte rows per block:   {start: u32, packed: u32, unpacked: u32}
//! ot.bzz   the compressed blocks
//! ```
//!
//! A read resolves the verse row, decompresses its block (or reuses the
//! session's one-slot cache) and slices `[start, start + size)` out of the
//! unpacked bytes. Consecutive reads from one block decompress once.

use lectern_core::bytes::{decode_u16_le, decode_u32_le};
use lectern_core::Charset;
use lectern_crypto::decipher_in_place;
use lectern_versification::{registry, Testament, Verse, Versification};
use tracing::warn;

use crate::backend::{testament_basename, BlockCache};
use crate::codec::{codec_for_name, Codec};
use crate::error::Result;
use crate::module_file::ModuleFile;
use crate::session::{BlockType, ModuleSpec};

const VERSE_ROW_SIZE: usize = 10;
const BLOCK_ROW_SIZE: usize = 12;

/// Open verse-index / block-index / data triple for one testament.
struct ZTestamentFiles {
    verse_index: ModuleFile,
    block_index: ModuleFile,
    data: ModuleFile,
}

/// An open compressed verse module.
pub struct ZVerseSession {
    old: Option<ZTestamentFiles>,
    new: Option<ZTestamentFiles>,
    v11n: &'static Versification,
    charset: Charset,
    cipher_key: Option<Vec<u8>>,
    codec: Box<dyn Codec>,
    cache: BlockCache,
}

impl ZVerseSession {
    pub fn open(spec: &ModuleSpec, block: BlockType) -> Result<ZVerseSession> {
        let codec = codec_for_name(spec.codec.as_deref().unwrap_or("ZIP"))?;
        ZVerseSession::open_with_codec(spec, block, codec)
    }

    /// Open with an explicit codec in place of the spec's declared one.
    pub fn open_with_codec(
        spec: &ModuleSpec,
        block: BlockType,
        codec: Box<dyn Codec>,
    ) -> Result<ZVerseSession> {
        let session = ZVerseSession {
            old: open_testament(spec, Testament::Old, block),
            new: open_testament(spec, Testament::New, block),
            v11n: registry::get(&spec.versification)?,
            charset: Charset::resolve(spec.charset.as_deref()),
            cipher_key: spec.cipher().map(<[u8]>::to_vec),
            codec,
            cache: BlockCache::new(),
        };
        if session.old.is_none() && session.new.is_none() {
            warn!(
                module = %spec.initials,
                path = %spec.data_path.display(),
                "no testament files found"
            );
        }
        Ok(session)
    }

    /// Whether the module stores text for this verse. Reads the verse index
    /// only; nothing is decompressed.
    pub fn contains(&self, verse: &Verse) -> bool {
        self.length(verse) > 0
    }

    /// The verse's size within its decompressed block, 0 when absent.
    pub fn length(&self, verse: &Verse) -> u32 {
        let Some((testament, row)) = self.locate(verse) else {
            return 0;
        };
        let Some(files) = self.files(testament) else {
            return 0;
        };
        match verse_row(&files.verse_index, row) {
            Some((_, _, size)) => size as u32,
            None => 0,
        }
    }

    /// Read and decode the verse text. Absent verses, a missing testament,
    /// and out-of-system references read as empty; a verse row pointing
    /// outside its decompressed block is logged and read as empty.
    pub fn read(&mut self, verse: &Verse) -> Result<String> {
        let Some((testament, row)) = self.locate(verse) else {
            return Ok(String::new());
        };
        let Some(files) = self.files(testament) else {
            return Ok(String::new());
        };
        let Some((block, start, size)) = verse_row(&files.verse_index, row) else {
            return Ok(String::new());
        };
        if size == 0 {
            return Ok(String::new());
        }

        if !self.cache.holds(block, Some(testament)) {
            let row_bytes = files
                .block_index
                .read_at(block as usize * BLOCK_ROW_SIZE, BLOCK_ROW_SIZE);
            if row_bytes.len() < BLOCK_ROW_SIZE {
                warn!(%verse, block, "block index row missing");
                return Ok(String::new());
            }
            let block_start = decode_u32_le(&row_bytes, 0);
            let packed_size = decode_u32_le(&row_bytes, 4);
            let unpacked_size = decode_u32_le(&row_bytes, 8);

            let mut packed = files.data.read_at(block_start as usize, packed_size as usize);
            if let Some(key) = &self.cipher_key {
                decipher_in_place(key, &mut packed);
            }
            let unpacked = self.codec.uncompress(&packed, Some(unpacked_size as usize))?;
            self.cache.fill(block, Some(testament), unpacked);
        }

        let bytes = self.cache.bytes();
        let start = start as usize;
        let end = start + size as usize;
        if end > bytes.len() {
            warn!(
                %verse,
                block,
                start,
                size,
                unpacked = bytes.len(),
                "verse row points outside its decompressed block"
            );
            return Ok(String::new());
        }
        Ok(self.charset.decode(&bytes[start..end]))
    }

    /// Every verse the module stores text for, in ordinal order. Scans the
    /// verse index files only.
    pub fn global_key_list(&self) -> Vec<Verse> {
        let mut keys = Vec::new();
        if let Some(files) = &self.old {
            self.scan_index(files, Testament::Old, &mut keys);
        }
        if let Some(files) = &self.new {
            self.scan_index(files, Testament::New, &mut keys);
        }
        keys
    }

    fn locate(&self, verse: &Verse) -> Option<(Testament, u32)> {
        self.v11n
            .validate(verse.book, verse.chapter as i32, verse.verse as i32)
            .ok()?;
        let ordinal = self.v11n.ordinal(verse);
        let testament = self.v11n.testament(ordinal);
        self.files(testament)?;
        Some((testament, self.v11n.testament_ordinal(ordinal)))
    }

    fn files(&self, testament: Testament) -> Option<&ZTestamentFiles> {
        match testament {
            Testament::Old => self.old.as_ref(),
            Testament::New => self.new.as_ref(),
        }
    }

    fn scan_index(&self, files: &ZTestamentFiles, testament: Testament, keys: &mut Vec<Verse>) {
        let file_rows = (files.verse_index.len() / VERSE_ROW_SIZE) as u32;
        if file_rows == 0 {
            return;
        }
        let ot_max = self.v11n.count(Some(Testament::Old)) - 1;
        let (first, last, base) = match testament {
            Testament::Old => (0, ot_max, 0),
            Testament::New => (1, self.v11n.count(Some(Testament::New)), ot_max),
        };
        for row in first..=last.min(file_rows - 1) {
            if let Some((_, _, size)) = verse_row(&files.verse_index, row) {
                if size > 0 {
                    keys.push(self.v11n.decode_ordinal(base + row));
                }
            }
        }
    }
}

/// Decode verse-index row `row` to `(block, start, size)`. Rows the file
/// does not fully cover decode as absent.
fn verse_row(index: &ModuleFile, row: u32) -> Option<(u32, u32, u16)> {
    let bytes = index.read_at(row as usize * VERSE_ROW_SIZE, VERSE_ROW_SIZE);
    if bytes.len() < VERSE_ROW_SIZE {
        return None;
    }
    Some((
        decode_u32_le(&bytes, 0),
        decode_u32_le(&bytes, 4),
        decode_u16_le(&bytes, 8),
    ))
}

fn open_testament(
    spec: &ModuleSpec,
    testament: Testament,
    block: BlockType,
) -> Option<ZTestamentFiles> {
    let name = testament_basename(testament);
    let c = block.indicator();
    let part = |p: char| spec.data_path.join(format!("{name}.{c}z{p}"));
    Some(ZTestamentFiles {
        verse_index: ModuleFile::open_optional(&part('v'))?,
        block_index: ModuleFile::open_optional(&part('s'))?,
        data: ModuleFile::open_optional(&part('z'))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ZipCodec;
    use crate::session::ModuleLayout;
    use lectern_core::bytes::{encode_u16_le, encode_u32_le};
    use lectern_versification::BibleBook;
    use std::fs;
    use tempfile::TempDir;

    /// Lay out an OT-only module with all verses packed into block 0.
    fn make_z_module(verses: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut block = Vec::new();
        let mut verse_index = Vec::new();
        for text in verses {
            let mut row = [0u8; 10];
            encode_u32_le(&mut row, 0, 0);
            encode_u32_le(&mut row, 4, block.len() as u32);
            encode_u16_le(&mut row, 8, text.len() as u16);
            verse_index.extend_from_slice(&row);
            block.extend_from_slice(text.as_bytes());
        }
        let packed = ZipCodec.compress(&block).unwrap();
        let mut block_index = [0u8; 12];
        encode_u32_le(&mut block_index, 0, 0);
        encode_u32_le(&mut block_index, 4, packed.len() as u32);
        encode_u32_le(&mut block_index, 8, block.len() as u32);
        fs::write(dir.path().join("ot.bzv"), verse_index).unwrap();
        fs::write(dir.path().join("ot.bzs"), block_index).unwrap();
        fs::write(dir.path().join("ot.bzz"), packed).unwrap();
        dir
    }

    fn make_session(dir: &TempDir) -> ZVerseSession {
        let spec = ModuleSpec::new(
            "Test",
            dir.path(),
            ModuleLayout::ZText {
                block: BlockType::Book,
            },
        );
        ZVerseSession::open(&spec, BlockType::Book).unwrap()
    }

    #[test]
    fn test_read_slices_block_without_trimming() {
        let dir = make_z_module(&["", "", "", "", "In the beginning ", "God created "]);
        let mut session = make_session(&dir);
        let gen11 = Verse::new(BibleBook::Gen, 1, 1);
        assert!(session.contains(&gen11));
        assert_eq!(session.read(&gen11).unwrap(), "In the beginning ");
        assert_eq!(session.read(&Verse::new(BibleBook::Gen, 1, 2)).unwrap(), "God created ");
        assert_eq!(session.length(&gen11), 17);
    }

    #[test]
    fn test_absent_and_out_of_range_read_empty() {
        let dir = make_z_module(&["", "", "", "", "text"]);
        let mut session = make_session(&dir);
        assert!(!session.contains(&Verse::new(BibleBook::Gen, 0, 0)));
        assert_eq!(session.read(&Verse::new(BibleBook::John, 3, 16)).unwrap(), "");
        assert_eq!(session.read(&Verse::new(BibleBook::Gen, 99, 1)).unwrap(), "");
    }

    #[test]
    fn test_slice_outside_block_degrades_to_empty() {
        let dir = make_z_module(&["", "", "", "", "text"]);
        // Rewrite row 4 to reach past the unpacked block.
        let path = dir.path().join("ot.bzv");
        let mut verse_index = fs::read(&path).unwrap();
        encode_u32_le(&mut verse_index, 4 * 10 + 4, 2);
        encode_u16_le(&mut verse_index, 4 * 10 + 8, 100);
        fs::write(&path, verse_index).unwrap();

        let mut session = make_session(&dir);
        let gen11 = Verse::new(BibleBook::Gen, 1, 1);
        assert!(session.contains(&gen11));
        assert_eq!(session.read(&gen11).unwrap(), "");
    }

    #[test]
    fn test_global_key_list_matches_contains() {
        let dir = make_z_module(&["", "", "", "intro", "one", "", "three"]);
        let session = make_session(&dir);
        let keys = session.global_key_list();
        assert_eq!(
            keys,
            vec![
                Verse::new(BibleBook::Gen, 1, 0),
                Verse::new(BibleBook::Gen, 1, 1),
                Verse::new(BibleBook::Gen, 1, 3),
            ]
        );
        for key in &keys {
            assert!(session.contains(key));
        }
    }
}
