//! Storage backends, one session type per physical layout.
//!
//! [`ModuleBackend::open`] inspects the layout in a
//! [`ModuleSpec`](crate::ModuleSpec) and opens the matching session. All
//! lookups go through [`ModuleKey`], which must match the module's key
//! space: verse addresses for text modules, headwords for dictionaries,
//! path segments for tree-keyed books.

pub mod dict;
pub mod raw_verse;
pub mod tree;
pub mod z_verse;

use lectern_versification::{Testament, Verse};

use crate::error::{Result, StorageError};
use crate::session::{ModuleLayout, ModuleSpec};

pub use dict::{RawDictSession, ZDictSession};
pub use raw_verse::RawVerseSession;
pub use tree::{TreeNode, TreeSession};
pub use z_verse::ZVerseSession;

/// A lookup key, shaped to the module's key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKey {
    /// Verse address for text modules.
    Verse(Verse),
    /// Headword for dictionary modules.
    Headword(String),
    /// Path from the root for tree-keyed books, one segment per level.
    Path(Vec<String>),
}

impl ModuleKey {
    fn kind(&self) -> &'static str {
        match self {
            ModuleKey::Verse(_) => "verse",
            ModuleKey::Headword(_) => "headword",
            ModuleKey::Path(_) => "path",
        }
    }
}

/// An open module: a session with its mapped files, dispatched by layout.
pub enum ModuleBackend {
    RawVerse(RawVerseSession),
    ZVerse(ZVerseSession),
    RawDict(RawDictSession),
    ZDict(ZDictSession),
    Tree(TreeSession),
}

impl ModuleBackend {
    /// Open the session matching the spec's layout.
    pub fn open(spec: &ModuleSpec) -> Result<ModuleBackend> {
        match spec.layout {
            ModuleLayout::RawText { datasize } => Ok(ModuleBackend::RawVerse(
                RawVerseSession::open(spec, datasize)?,
            )),
            ModuleLayout::ZText { block } => {
                Ok(ModuleBackend::ZVerse(ZVerseSession::open(spec, block)?))
            }
            ModuleLayout::RawLd { datasize } => Ok(ModuleBackend::RawDict(
                RawDictSession::open(spec, datasize)?,
            )),
            ModuleLayout::ZLd => Ok(ModuleBackend::ZDict(ZDictSession::open(spec)?)),
            ModuleLayout::Tree => Ok(ModuleBackend::Tree(TreeSession::open(spec)?)),
        }
    }

    /// Whether the module holds an entry for this key.
    pub fn contains(&self, key: &ModuleKey) -> Result<bool> {
        match (self, key) {
            (ModuleBackend::RawVerse(s), ModuleKey::Verse(v)) => Ok(s.contains(v)),
            (ModuleBackend::ZVerse(s), ModuleKey::Verse(v)) => Ok(s.contains(v)),
            (ModuleBackend::RawDict(s), ModuleKey::Headword(w)) => Ok(s.contains(w)),
            (ModuleBackend::ZDict(s), ModuleKey::Headword(w)) => Ok(s.contains(w)),
            (ModuleBackend::Tree(s), ModuleKey::Path(p)) => Ok(s.contains(p)),
            (backend, key) => Err(backend.key_mismatch(key)),
        }
    }

    /// Read the entry text for this key. Absent keys read as empty.
    pub fn read(&mut self, key: &ModuleKey) -> Result<String> {
        match (self, key) {
            (ModuleBackend::RawVerse(s), ModuleKey::Verse(v)) => Ok(s.read(v)),
            (ModuleBackend::ZVerse(s), ModuleKey::Verse(v)) => s.read(v),
            (ModuleBackend::RawDict(s), ModuleKey::Headword(w)) => Ok(s.read(w)),
            (ModuleBackend::ZDict(s), ModuleKey::Headword(w)) => s.read(w),
            (ModuleBackend::Tree(s), ModuleKey::Path(p)) => Ok(s.read(p)),
            (backend, key) => Err(backend.key_mismatch(key)),
        }
    }

    /// Stored size of the entry for this key, 0 when absent.
    pub fn length(&self, key: &ModuleKey) -> Result<u32> {
        match (self, key) {
            (ModuleBackend::RawVerse(s), ModuleKey::Verse(v)) => Ok(s.length(v)),
            (ModuleBackend::ZVerse(s), ModuleKey::Verse(v)) => Ok(s.length(v)),
            (ModuleBackend::RawDict(s), ModuleKey::Headword(w)) => Ok(s.length(w)),
            (ModuleBackend::ZDict(s), ModuleKey::Headword(w)) => Ok(s.length(w)),
            (ModuleBackend::Tree(s), ModuleKey::Path(p)) => Ok(s.length(p)),
            (backend, key) => Err(backend.key_mismatch(key)),
        }
    }

    /// Every key the module holds, in storage order.
    pub fn global_key_list(&self) -> Vec<ModuleKey> {
        match self {
            ModuleBackend::RawVerse(s) => {
                s.global_key_list().into_iter().map(ModuleKey::Verse).collect()
            }
            ModuleBackend::ZVerse(s) => {
                s.global_key_list().into_iter().map(ModuleKey::Verse).collect()
            }
            ModuleBackend::RawDict(s) => {
                s.global_key_list().into_iter().map(ModuleKey::Headword).collect()
            }
            ModuleBackend::ZDict(s) => {
                s.global_key_list().into_iter().map(ModuleKey::Headword).collect()
            }
            ModuleBackend::Tree(s) => {
                s.read_index().into_iter().map(ModuleKey::Path).collect()
            }
        }
    }

    fn key_mismatch(&self, key: &ModuleKey) -> StorageError {
        let layout = match self {
            ModuleBackend::RawVerse(_) | ModuleBackend::ZVerse(_) => "verse",
            ModuleBackend::RawDict(_) | ModuleBackend::ZDict(_) => "dictionary",
            ModuleBackend::Tree(_) => "tree",
        };
        StorageError::UnsupportedLayout(format!(
            "{layout} module cannot address a {} key",
            key.kind()
        ))
    }
}

/// Testament half of a verse module's file names.
pub(crate) fn testament_basename(testament: Testament) -> &'static str {
    match testament {
        Testament::Old => "ot",
        Testament::New => "nt",
    }
}

/// `<data_path>.<ext>` for keyed modules, whose data path is a file name
/// prefix rather than a directory. Appended, not replaced, so a dotted
/// module name keeps its full prefix.
pub(crate) fn prefixed(spec: &ModuleSpec, ext: &str) -> std::path::PathBuf {
    let mut name = spec.data_path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    std::path::PathBuf::from(name)
}

/// Capacity-1 cache of the most recently decompressed block. The only
/// mutable cross-call state a session holds.
pub(crate) struct BlockCache {
    block: i64,
    testament: Option<Testament>,
    bytes: Vec<u8>,
}

impl BlockCache {
    pub(crate) fn new() -> BlockCache {
        BlockCache {
            block: -1,
            testament: None,
            bytes: Vec::new(),
        }
    }

    /// Whether the cache currently holds this block.
    pub(crate) fn holds(&self, block: u32, testament: Option<Testament>) -> bool {
        self.block == i64::from(block) && self.testament == testament
    }

    /// Replace the cached block unconditionally.
    pub(crate) fn fill(&mut self, block: u32, testament: Option<Testament>, bytes: Vec<u8>) {
        self.block = i64::from(block);
        self.testament = testament;
        self.bytes = bytes;
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
