//! Readers for SWORD module storage.
//!
//! A module is a handful of flat files on disk; which files depends on the
//! layout its configuration declares:
//!
//! ```text
//! layout     keyed by      files
//! ------     --------      -----
//! RawText    verse refs    ot, ot.vss, nt, nt.vss
//! ZText      verse refs    {ot,nt}.bzv  {ot,nt}.bzs  {ot,nt}.bzz
//! RawLd      headwords     <name>.idx  <name>.dat
//! ZLd        headwords     <name>.idx  <name>.dat  <name>.zdx  <name>.zdt
//! Tree       node paths    <name>.idx  <name>.dat  <name>.bdt
//! ```
//!
//! [`ModuleBackend::open`] picks the session type for a [`ModuleSpec`] and
//! fronts it behind one key-addressed read interface. Sessions memory-map
//! their files, decipher and decompress lazily, and treat absence as
//! emptiness: a key the module does not carry reads as `""`, never as an
//! error. Errors are reserved for calls that cannot proceed at all, such as
//! a missing required file, an undeclared layout or codec, or a compressed
//! block that will not inflate.

pub mod backend;
pub mod codec;
pub mod entry;
pub mod error;
pub mod lzss;
pub mod module_file;
pub mod session;

// ── Sessions ─────────────────────────────────────────────────────────────────
pub use backend::{
    ModuleBackend, ModuleKey, RawDictSession, RawVerseSession, TreeNode, TreeSession,
    ZDictSession, ZVerseSession,
};

// ── Module descriptors ───────────────────────────────────────────────────────
pub use session::{BlockType, KeyPolicy, ModuleLayout, ModuleSpec};

// ── Codecs ───────────────────────────────────────────────────────────────────
pub use codec::{codec_for_name, Codec, LzssCodec, ZipCodec};

// ── Records ──────────────────────────────────────────────────────────────────
pub use entry::{DataEntry, DataIndex};
pub use module_file::ModuleFile;

// ── Errors ───────────────────────────────────────────────────────────────────
pub use error::{Result, StorageError};
