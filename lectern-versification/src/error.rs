//! Error types for versification lookups.

use crate::book::BibleBook;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersificationError {
    /// The named reference system has not been registered.
    #[error("unknown versification system: {0}")]
    UnknownSystem(String),

    /// A book/chapter/verse triple falls outside the system's tables.
    /// `limit` is the largest legal value for the offending part.
    #[error("{book} {chapter}:{verse} out of range ({part} must be 0..={limit})")]
    OutOfRange {
        book: BibleBook,
        chapter: i32,
        verse: i32,
        part: &'static str,
        limit: u32,
    },
}

pub type Result<T> = std::result::Result<T, VersificationError>;
