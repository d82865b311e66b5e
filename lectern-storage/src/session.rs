//! Module descriptors.
//!
//! A [`ModuleSpec`] names a module's data files and carries the behavioral
//! switches its configuration declares: physical layout, reference system,
//! charset, compression codec, cipher key, and key-handling quirks. The spec
//! is plain data; [`ModuleBackend::open`](crate::ModuleBackend::open) turns
//! it into a session owning the mapped files.

use std::path::PathBuf;

/// Physical layout of a module's data files.
///
/// The layout decides which files are opened and how records are addressed.
/// `datasize` is the byte width of the size field in index rows and must be
/// 2 or 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLayout {
    /// Per-testament plain verse text: `ot`/`ot.vss`, `nt`/`nt.vss`.
    RawText { datasize: u8 },
    /// Per-testament compressed verse text: `ot.bzv`/`ot.bzs`/`ot.bzz` for
    /// book-grained blocks, `c`/`v` in place of `b` for finer grains.
    ZText { block: BlockType },
    /// Keyed dictionary: `<name>.idx` + `<name>.dat`.
    RawLd { datasize: u8 },
    /// Compressed keyed dictionary: `<name>.idx/.dat` keys plus
    /// `<name>.zdx/.zdt` block storage.
    ZLd,
    /// Tree-keyed book: `<name>.idx` + `<name>.dat` + `<name>.bdt`.
    Tree,
}

/// Compression granularity of a [`ModuleLayout::ZText`] module.
///
/// Only the file names carry the granularity; the read path is the same for
/// all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Book,
    Chapter,
    Verse,
}

impl BlockType {
    /// The letter spliced into compressed-verse file names.
    pub fn indicator(self) -> char {
        match self {
            BlockType::Book => 'b',
            BlockType::Chapter => 'c',
            BlockType::Verse => 'v',
        }
    }
}

/// Key-handling switches a dictionary module declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    /// Keys compare without case folding; a failed binary search falls back
    /// to a linear scan.
    pub case_sensitive: bool,
    /// Keys are `MM.DD` dates presented externally as day names.
    pub daily_devotion: bool,
    /// Keys are Strong's Greek numbers.
    pub greek_definitions: bool,
    /// Keys are Strong's Hebrew numbers.
    pub hebrew_definitions: bool,
    /// Strong's numbers are stored zero-padded (`G0001`). Modules that
    /// disable this store bare numbers (`G1`).
    pub strongs_padding: bool,
}

impl Default for KeyPolicy {
    fn default() -> KeyPolicy {
        KeyPolicy {
            case_sensitive: false,
            daily_devotion: false,
            greek_definitions: false,
            hebrew_definitions: false,
            strongs_padding: true,
        }
    }
}

/// Everything needed to open a module's data files.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    /// Short module identifier, e.g. `"KJV"` or `"naslex"`.
    pub initials: String,
    /// Directory holding the verse files, or the shared file-name prefix of
    /// dictionary and tree modules (`/path/dict` for `/path/dict.idx`).
    pub data_path: PathBuf,
    pub layout: ModuleLayout,
    /// Reference system name, resolved through the versification registry.
    pub versification: String,
    /// Declared charset. `None` and unknown names fall back to cp1252.
    pub charset: Option<String>,
    /// Codec name for compressed layouts. `None` means ZIP.
    pub codec: Option<String>,
    /// Cipher key of enciphered modules. Absent or empty means plain text.
    pub cipher_key: Option<Vec<u8>>,
    pub keys: KeyPolicy,
}

impl ModuleSpec {
    /// A spec with defaults: KJV reference system, no charset declaration,
    /// default codec, no cipher, default key policy.
    pub fn new(
        initials: impl Into<String>,
        data_path: impl Into<PathBuf>,
        layout: ModuleLayout,
    ) -> ModuleSpec {
        ModuleSpec {
            initials: initials.into(),
            data_path: data_path.into(),
            layout,
            versification: "KJV".to_string(),
            charset: None,
            codec: None,
            cipher_key: None,
            keys: KeyPolicy::default(),
        }
    }

    /// Cipher key as a slice, `None` when absent or empty.
    pub(crate) fn cipher(&self) -> Option<&[u8]> {
        match &self.cipher_key {
            Some(key) if !key.is_empty() => Some(&key[..]),
            _ => None,
        }
    }
}
