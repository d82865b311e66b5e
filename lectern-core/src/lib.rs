//! Shared primitives for the lectern storage engine.
//!
//! This crate owns the byte-level helpers every module layout decodes
//! through: unsigned little-endian integer codecs over fixed-width index
//! rows, terminator scans, and charset decoding for record payloads
//! (UTF-8 plus the legacy single-byte cp1252 with its control-byte scrub).
//! It has no knowledge of any particular file layout.

pub mod bytes;
pub mod charset;

// ── Byte codecs ──────────────────────────────────────────────────────────────
pub use bytes::{decode_u16_le, decode_u32_le, encode_u16_le, encode_u32_le, find_byte};

// ── Charset ──────────────────────────────────────────────────────────────────
pub use charset::Charset;
