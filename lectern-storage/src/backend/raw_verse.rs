//! Uncompressed per-testament verse storage.
//!
//! Each testament is a file pair: `ot` holds verse text back to back,
//! `ot.vss` one `{offset: u32, size: u16|u32}` row per testament ordinal
//! (`nt`/`nt.vss` likewise). Reading a verse is two bounded reads: the row
//! at `ordinal * (4 + datasize)`, then `size` bytes of text at `offset`.

use lectern_core::Charset;
use lectern_crypto::decipher_in_place;
use lectern_versification::{registry, Testament, Verse, Versification};
use tracing::warn;

use crate::backend::testament_basename;
use crate::entry::DataIndex;
use crate::error::{Result, StorageError};
use crate::module_file::ModuleFile;
use crate::session::ModuleSpec;

/// Open text + index pair for one testament.
struct TestamentFiles {
    text: ModuleFile,
    index: ModuleFile,
}

/// An open uncompressed verse module.
///
/// A missing testament is not an error; every lookup into it reads as
/// absent.
pub struct RawVerseSession {
    old: Option<TestamentFiles>,
    new: Option<TestamentFiles>,
    v11n: &'static Versification,
    charset: Charset,
    cipher_key: Option<Vec<u8>>,
    datasize: u8,
}

impl RawVerseSession {
    pub fn open(spec: &ModuleSpec, datasize: u8) -> Result<RawVerseSession> {
        if datasize != 2 && datasize != 4 {
            return Err(StorageError::UnsupportedLayout(format!(
                "raw verse datasize {datasize}"
            )));
        }
        let session = RawVerseSession {
            old: open_testament(spec, Testament::Old),
            new: open_testament(spec, Testament::New),
            v11n: registry::get(&spec.versification)?,
            charset: Charset::resolve(spec.charset.as_deref()),
            cipher_key: spec.cipher().map(<[u8]>::to_vec),
            datasize,
        };
        if session.old.is_none() && session.new.is_none() {
            warn!(
                module = %spec.initials,
                path = %spec.data_path.display(),
                "no testament files found"
            );
        }
        Ok(session)
    }

    /// Whether the module stores text for this verse.
    pub fn contains(&self, verse: &Verse) -> bool {
        self.length(verse) > 0
    }

    /// The verse's stored size in bytes, 0 when absent.
    pub fn length(&self, verse: &Verse) -> u32 {
        match self.locate(verse) {
            Some((files, row)) => DataIndex::read_row(&files.index, row, self.datasize).size,
            None => 0,
        }
    }

    /// Read and decode the verse text. Absent verses, a missing testament,
    /// and out-of-system references all read as empty.
    pub fn read(&self, verse: &Verse) -> String {
        let Some((files, row)) = self.locate(verse) else {
            return String::new();
        };
        let index = DataIndex::read_row(&files.index, row, self.datasize);
        if index.size == 0 {
            return String::new();
        }
        if index.size > i32::MAX as u32 {
            warn!(%verse, size = index.size, "verse row size overflow, skipping");
            return String::new();
        }

        let mut data = files.text.read_at(index.offset as usize, index.size as usize);
        if let Some(key) = &self.cipher_key {
            decipher_in_place(key, &mut data);
        }
        self.charset.decode(&data).trim().to_string()
    }

    /// Every verse the module stores text for, in ordinal order. Scans the
    /// index files outright instead of probing verse by verse.
    pub fn global_key_list(&self) -> Vec<Verse> {
        let mut keys = Vec::new();
        if let Some(files) = &self.old {
            self.scan_index(files, Testament::Old, &mut keys);
        }
        if let Some(files) = &self.new {
            self.scan_index(files, Testament::New, &mut keys);
        }
        keys
    }

    /// Resolve a verse to its testament's files and per-testament ordinal.
    fn locate(&self, verse: &Verse) -> Option<(&TestamentFiles, u32)> {
        self.v11n
            .validate(verse.book, verse.chapter as i32, verse.verse as i32)
            .ok()?;
        let ordinal = self.v11n.ordinal(verse);
        let files = match self.v11n.testament(ordinal) {
            Testament::Old => self.old.as_ref()?,
            Testament::New => self.new.as_ref()?,
        };
        Some((files, self.v11n.testament_ordinal(ordinal)))
    }

    fn scan_index(&self, files: &TestamentFiles, testament: Testament, keys: &mut Vec<Verse>) {
        let entry_size = 4 + self.datasize as usize;
        let file_rows = (files.index.len() / entry_size) as u32;
        if file_rows == 0 {
            return;
        }
        // Old-testament rows start at ordinal 0 (the module introduction);
        // new-testament row 0 is unaddressable, its intro lives at row 1.
        let ot_max = self.v11n.count(Some(Testament::Old)) - 1;
        let (first, last, base) = match testament {
            Testament::Old => (0, ot_max, 0),
            Testament::New => (1, self.v11n.count(Some(Testament::New)), ot_max),
        };
        for row in first..=last.min(file_rows - 1) {
            if DataIndex::read_row(&files.index, row, self.datasize).size > 0 {
                keys.push(self.v11n.decode_ordinal(base + row));
            }
        }
    }
}

fn open_testament(spec: &ModuleSpec, testament: Testament) -> Option<TestamentFiles> {
    let name = testament_basename(testament);
    Some(TestamentFiles {
        text: ModuleFile::open_optional(&spec.data_path.join(name))?,
        index: ModuleFile::open_optional(&spec.data_path.join(format!("{name}.vss")))?,
    })
}
