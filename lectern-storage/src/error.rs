//! Error types for module storage operations.
//!
//! Absence is never an error here: a key that is not in a module comes back
//! as `false`/empty/negative-insertion from the read paths. These variants
//! cover the conditions that make a call itself fail: an unreadable file, a
//! module declaring a layout or codec this crate does not speak, or a record
//! that cannot be decoded at all.

use lectern_versification::VersificationError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported module layout: {0}")]
    UnsupportedLayout(String),

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Versification(#[from] VersificationError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
