//! Tree-keyed books through the unified backend interface.

use lectern_crypto::encipher_in_place;
use lectern_storage::{ModuleBackend, ModuleKey, ModuleLayout, ModuleSpec, StorageError};
use lectern_versification::{BibleBook, Verse};
use std::fs;
use tempfile::TempDir;

const GENESIS: &str = "Book of beginnings";
const EXODUS: &str = "Book of departure";
const CHAPTER: &str = "In the beginning";

struct Node {
    parent: i32,
    next_sibling: i32,
    first_child: i32,
    name: &'static str,
    content: Option<&'static str>,
}

/// Root with children "Genesis" and "Exodus"; "Genesis" carries both text
/// of its own and a "Chapter 1" child.
fn write_book(dir: &TempDir, cipher: Option<&[u8]>) {
    // Offsets in the .idx file: root 0, Genesis 4, Exodus 8, Chapter 1 12.
    let nodes = [
        Node { parent: -1, next_sibling: -1, first_child: 4, name: "", content: None },
        Node { parent: 0, next_sibling: 8, first_child: 12, name: "Genesis", content: Some(GENESIS) },
        Node { parent: 0, next_sibling: -1, first_child: -1, name: "Exodus", content: Some(EXODUS) },
        Node { parent: 4, next_sibling: -1, first_child: -1, name: "Chapter 1", content: Some(CHAPTER) },
    ];

    let mut idx = Vec::new();
    let mut dat = Vec::new();
    let mut bdt = Vec::new();
    for node in &nodes {
        idx.extend_from_slice(&(dat.len() as u32).to_le_bytes());
        dat.extend_from_slice(&node.parent.to_le_bytes());
        dat.extend_from_slice(&node.next_sibling.to_le_bytes());
        dat.extend_from_slice(&node.first_child.to_le_bytes());
        dat.extend_from_slice(node.name.as_bytes());
        dat.push(0);
        match node.content {
            Some(text) => {
                let mut span = text.as_bytes().to_vec();
                if let Some(key) = cipher {
                    encipher_in_place(key, &mut span);
                }
                dat.extend_from_slice(&8u16.to_le_bytes());
                dat.extend_from_slice(&(bdt.len() as u32).to_le_bytes());
                dat.extend_from_slice(&(span.len() as u32).to_le_bytes());
                bdt.extend_from_slice(&span);
            }
            None => dat.extend_from_slice(&0u16.to_le_bytes()),
        }
    }

    let base = dir.path().join("book");
    fs::write(base.with_extension("idx"), idx).expect("write idx");
    fs::write(base.with_extension("dat"), dat).expect("write dat");
    fs::write(base.with_extension("bdt"), bdt).expect("write bdt");
}

fn open(dir: &TempDir, cipher: Option<&[u8]>) -> ModuleBackend {
    let mut spec = ModuleSpec::new("TestBook", dir.path().join("book"), ModuleLayout::Tree);
    spec.cipher_key = cipher.map(<[u8]>::to_vec);
    ModuleBackend::open(&spec).expect("open")
}

fn path(segments: &[&str]) -> ModuleKey {
    ModuleKey::Path(segments.iter().map(|s| s.to_string()).collect())
}

#[test]
fn reads_nodes_by_path() {
    let dir = TempDir::new().expect("tempdir");
    write_book(&dir, None);
    let mut book = open(&dir, None);

    assert_eq!(book.read(&path(&["Genesis"])).expect("read"), GENESIS);
    assert_eq!(
        book.read(&path(&["Genesis", "Chapter 1"])).expect("read"),
        CHAPTER
    );
    assert_eq!(book.read(&path(&["Exodus"])).expect("read"), EXODUS);

    assert!(book.contains(&path(&["Genesis"])).expect("contains"));
    assert!(!book.contains(&path(&["Leviticus"])).expect("contains"));
    assert_eq!(book.read(&path(&["Leviticus"])).expect("read"), "");
    assert_eq!(
        book.length(&path(&["Genesis"])).expect("length"),
        GENESIS.len() as u32
    );
    // The root exists but holds no text.
    assert!(book.contains(&path(&[])).expect("contains"));
    assert_eq!(book.length(&path(&[])).expect("length"), 0);
}

#[test]
fn verse_keys_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_book(&dir, None);
    let mut book = open(&dir, None);

    let verse = ModuleKey::Verse(Verse::new(BibleBook::Gen, 1, 1));
    assert!(matches!(
        book.contains(&verse),
        Err(StorageError::UnsupportedLayout(_))
    ));
    assert!(matches!(
        book.read(&verse),
        Err(StorageError::UnsupportedLayout(_))
    ));
}

#[test]
fn global_key_list_is_preorder() {
    let dir = TempDir::new().expect("tempdir");
    write_book(&dir, None);
    let book = open(&dir, None);

    assert_eq!(
        book.global_key_list(),
        vec![
            path(&["Genesis"]),
            path(&["Genesis", "Chapter 1"]),
            path(&["Exodus"]),
        ]
    );
}

#[test]
fn enciphered_content_deciphers() {
    let key = b"sesame";
    let dir = TempDir::new().expect("tempdir");
    write_book(&dir, Some(key));
    let mut book = open(&dir, Some(key));

    assert_eq!(book.read(&path(&["Genesis"])).expect("read"), GENESIS);
    assert_eq!(
        book.read(&path(&["Genesis", "Chapter 1"])).expect("read"),
        CHAPTER
    );
}
