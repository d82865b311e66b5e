//! Compressed verse modules: block cache behavior, exact slicing, and
//! deciphering, driven through real zlib blocks on disk.

use lectern_crypto::encipher_in_place;
use lectern_storage::{
    BlockType, Codec, ModuleBackend, ModuleKey, ModuleLayout, ModuleSpec, Result, ZVerseSession,
    ZipCodec,
};
use lectern_versification::{BibleBook, Verse};
use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

const GEN_1_1: &str = "In the beginning God created the heaven and the earth. ";
const GEN_1_2: &str = "And the earth was without form, and void.";
const GEN_1_3: &str = "And God said, Let there be light: and there was light.";

/// Delegates to zlib and counts every inflate.
struct CountingCodec {
    inflates: Rc<Cell<usize>>,
}

impl Codec for CountingCodec {
    fn name(&self) -> &'static str {
        "ZIP"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        ZipCodec.compress(data)
    }

    fn uncompress(&self, data: &[u8], expected: Option<usize>) -> Result<Vec<u8>> {
        self.inflates.set(self.inflates.get() + 1);
        ZipCodec.uncompress(data, expected)
    }
}

fn verse_row(out: &mut Vec<u8>, block: u32, start: u32, size: u16) {
    out.extend_from_slice(&block.to_le_bytes());
    out.extend_from_slice(&start.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
}

/// Two compressed blocks in the OT: Gen 1:1 and 1:3 share block 0,
/// Gen 1:2 sits alone in block 1.
fn write_module(cipher: Option<&[u8]>) -> TempDir {
    let block0 = format!("{GEN_1_1}{GEN_1_3}").into_bytes();
    let block1 = GEN_1_2.as_bytes().to_vec();
    let mut packed0 = ZipCodec.compress(&block0).expect("compress");
    let mut packed1 = ZipCodec.compress(&block1).expect("compress");
    if let Some(key) = cipher {
        encipher_in_place(key, &mut packed0);
        encipher_in_place(key, &mut packed1);
    }

    let mut verses = Vec::new();
    for _ in 0..4 {
        verse_row(&mut verses, 0, 0, 0);
    }
    verse_row(&mut verses, 0, 0, GEN_1_1.len() as u16);
    verse_row(&mut verses, 1, 0, GEN_1_2.len() as u16);
    verse_row(&mut verses, 0, GEN_1_1.len() as u32, GEN_1_3.len() as u16);

    let mut blocks = Vec::new();
    blocks.extend_from_slice(&0u32.to_le_bytes());
    blocks.extend_from_slice(&(packed0.len() as u32).to_le_bytes());
    blocks.extend_from_slice(&(block0.len() as u32).to_le_bytes());
    blocks.extend_from_slice(&(packed0.len() as u32).to_le_bytes());
    blocks.extend_from_slice(&(packed1.len() as u32).to_le_bytes());
    blocks.extend_from_slice(&(block1.len() as u32).to_le_bytes());

    let mut data = packed0;
    data.extend_from_slice(&packed1);

    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("ot.bzv"), verses).expect("write verse index");
    fs::write(dir.path().join("ot.bzs"), blocks).expect("write block index");
    fs::write(dir.path().join("ot.bzz"), data).expect("write block data");
    dir
}

fn open_counting(dir: &TempDir) -> (ZVerseSession, Rc<Cell<usize>>) {
    let spec = ModuleSpec::new(
        "TestZBible",
        dir.path(),
        ModuleLayout::ZText { block: BlockType::Book },
    );
    let inflates = Rc::new(Cell::new(0));
    let codec = CountingCodec { inflates: Rc::clone(&inflates) };
    let session =
        ZVerseSession::open_with_codec(&spec, BlockType::Book, Box::new(codec)).expect("open");
    (session, inflates)
}

/// Verses in one block share a single decompression.
#[test]
fn block_cache_decompresses_once_per_block() {
    let dir = write_module(None);
    let (mut session, inflates) = open_counting(&dir);

    let gen11 = Verse::new(BibleBook::Gen, 1, 1);
    let gen13 = Verse::new(BibleBook::Gen, 1, 3);

    assert_eq!(session.read(&gen11).expect("read"), GEN_1_1);
    assert_eq!(session.read(&gen11).expect("read"), GEN_1_1);
    assert_eq!(session.read(&gen13).expect("read"), GEN_1_3);
    assert_eq!(inflates.get(), 1);

    // Index-only operations never inflate.
    assert!(session.contains(&gen11));
    assert_eq!(session.length(&gen13), GEN_1_3.len() as u32);
    assert_eq!(inflates.get(), 1);
}

/// The cache holds one block; alternating blocks re-inflates.
#[test]
fn single_slot_cache_replaced_across_blocks() {
    let dir = write_module(None);
    let (mut session, inflates) = open_counting(&dir);

    let gen11 = Verse::new(BibleBook::Gen, 1, 1);
    let gen12 = Verse::new(BibleBook::Gen, 1, 2);

    assert_eq!(session.read(&gen11).expect("read"), GEN_1_1);
    assert_eq!(inflates.get(), 1);
    assert_eq!(session.read(&gen12).expect("read"), GEN_1_2);
    assert_eq!(inflates.get(), 2);
    assert_eq!(session.read(&gen11).expect("read"), GEN_1_1);
    assert_eq!(inflates.get(), 3);
}

/// The verse span is sliced exactly; a stored trailing space survives.
#[test]
fn read_preserves_exact_span() {
    let dir = write_module(None);
    let spec = ModuleSpec::new(
        "TestZBible",
        dir.path(),
        ModuleLayout::ZText { block: BlockType::Book },
    );
    let mut module = ModuleBackend::open(&spec).expect("open");

    let text = module
        .read(&ModuleKey::Verse(Verse::new(BibleBook::Gen, 1, 1)))
        .expect("read");
    assert_eq!(text, GEN_1_1);
    assert!(text.ends_with(' '));
}

/// Zero-size rows and missing testaments read as empty.
#[test]
fn absent_verses_read_empty() {
    let dir = write_module(None);
    let (mut session, inflates) = open_counting(&dir);

    let chapter_intro = Verse::new(BibleBook::Gen, 1, 0);
    let matt = Verse::new(BibleBook::Matt, 1, 1);

    assert!(!session.contains(&chapter_intro));
    assert!(!session.contains(&matt));
    assert_eq!(session.read(&chapter_intro).expect("read"), "");
    assert_eq!(session.read(&matt).expect("read"), "");
    assert_eq!(inflates.get(), 0);
}

/// Enciphered modules decipher the packed block before inflating.
#[test]
fn enciphered_blocks_decipher_before_inflating() {
    let key = b"sesame";
    let dir = write_module(Some(key));
    let mut spec = ModuleSpec::new(
        "TestZBible",
        dir.path(),
        ModuleLayout::ZText { block: BlockType::Book },
    );
    spec.cipher_key = Some(key.to_vec());
    let mut module = ModuleBackend::open(&spec).expect("open");

    for (verse, text) in [
        (Verse::new(BibleBook::Gen, 1, 1), GEN_1_1),
        (Verse::new(BibleBook::Gen, 1, 2), GEN_1_2),
        (Verse::new(BibleBook::Gen, 1, 3), GEN_1_3),
    ] {
        assert_eq!(module.read(&ModuleKey::Verse(verse)).expect("read"), text);
    }
}
