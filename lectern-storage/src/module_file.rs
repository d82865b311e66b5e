//! Random-access views over module files.
//!
//! Every backend reads its index and data files through [`ModuleFile`], a
//! memory-mapped read-only view with the soft-failure rules the module
//! format demands: shipped modules routinely carry index slack (rows that
//! point at nothing useful), so a read past the end of a file degrades to an
//! empty or truncated buffer instead of an error.

use lectern_core::bytes::find_byte;
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{error, warn};

/// Read-only view of one module file.
///
/// Zero-length files are held without a map; every read on them is empty.
pub struct ModuleFile {
    map: Option<Mmap>,
    len: usize,
}

impl ModuleFile {
    /// Open a module file for reading.
    pub fn open(path: &Path) -> io::Result<ModuleFile> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(ModuleFile { map, len })
    }

    /// Open a companion file a module may legitimately lack, such as one
    /// testament of a single-testament Bible. Absent or unopenable files
    /// come back as `None` and the caller treats the role as empty.
    pub fn open_optional(path: &Path) -> Option<ModuleFile> {
        if !path.exists() {
            return None;
        }
        match ModuleFile::open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open module file");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read `len` bytes at `offset`.
    ///
    /// A zero `len` or an `offset` at or past the end yields an empty
    /// buffer; a span running past the end is truncated to what remains.
    pub fn read_at(&self, offset: usize, len: usize) -> Vec<u8> {
        if len == 0 {
            return Vec::new();
        }
        let Some(map) = &self.map else {
            return Vec::new();
        };
        if offset >= self.len {
            error!(
                offset,
                len,
                file_len = self.len,
                "read past end of module file"
            );
            return Vec::new();
        }
        let end = offset.saturating_add(len).min(self.len);
        map[offset..end].to_vec()
    }

    /// Read from `offset` up to and including the first `stop` byte, or to
    /// the end of the file when the byte never appears.
    pub fn read_until(&self, offset: usize, stop: u8) -> Vec<u8> {
        let Some(map) = &self.map else {
            return Vec::new();
        };
        if offset >= self.len {
            error!(offset, file_len = self.len, "scan past end of module file");
            return Vec::new();
        }
        let rest = &map[offset..];
        match find_byte(rest, stop) {
            Some(pos) => rest[..=pos].to_vec(),
            None => rest.to_vec(),
        }
    }
}
