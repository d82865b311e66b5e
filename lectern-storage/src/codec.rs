//! Block compression codecs.
//!
//! Compressed layouts name their codec in the module's metadata; the name
//! resolves here to a [`Codec`]. Two codecs are spoken: `ZIP` (zlib streams,
//! the common case) and `LZSS` (the legacy ring-buffer scheme, see
//! [`crate::lzss`]).

use crate::error::{Result, StorageError};
use crate::lzss;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use std::io::Read;

/// A named block compressor.
///
/// `uncompress` takes the uncompressed size when the caller's index declares
/// one; `None` lets the stream determine the length.
pub trait Codec {
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn uncompress(&self, data: &[u8], expected: Option<usize>) -> Result<Vec<u8>>;
}

/// Resolve a module-declared codec name.
pub fn codec_for_name(name: &str) -> Result<Box<dyn Codec>> {
    match name.to_ascii_uppercase().as_str() {
        "ZIP" => Ok(Box::new(ZipCodec)),
        "LZSS" => Ok(Box::new(LzssCodec)),
        _ => Err(StorageError::UnsupportedCodec(name.to_string())),
    }
}

/// zlib deflate, as written by the mainline module tooling.
pub struct ZipCodec;

impl Codec for ZipCodec {
    fn name(&self) -> &'static str {
        "ZIP"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() / 2 + 16);
        ZlibEncoder::new(data, Compression::default()).read_to_end(&mut out)?;
        Ok(out)
    }

    fn uncompress(&self, data: &[u8], expected: Option<usize>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(expected.unwrap_or(data.len().saturating_mul(4)));
        ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| StorageError::Corrupt(format!("zlib stream: {e}")))?;
        Ok(out)
    }
}

/// Ring-buffer LZSS, kept for the older modules that still use it.
pub struct LzssCodec;

impl Codec for LzssCodec {
    fn name(&self) -> &'static str {
        "LZSS"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lzss::encode(data))
    }

    fn uncompress(&self, data: &[u8], expected: Option<usize>) -> Result<Vec<u8>> {
        Ok(lzss::decode(data, expected))
    }
}
