//! Versification: the ordinal map between verse references and the flat
//! record indexes bible module layouts are addressed by.
//!
//! A reference system orders books and fixes each chapter's verse count;
//! from those tables it derives one strictly-increasing ordinal per
//! addressable slot, introductions included. Storage backends work purely
//! in ordinals (or per-testament ordinals); everything here is pure table
//! lookup with no I/O.

pub mod book;
pub mod canon;
pub mod error;
pub mod registry;
pub mod system;

// ── Books and references ─────────────────────────────────────────────────────
pub use book::{BibleBook, Testament};
pub use system::{Verse, Versification};

// ── Registry ─────────────────────────────────────────────────────────────────
pub use registry::{get, kjv, register};

// ── Errors ───────────────────────────────────────────────────────────────────
pub use error::{Result, VersificationError};
