//! Keyed dictionary storage, raw and block-compressed.
//!
//! Both variants share one key table: `.idx` rows `{offset: u32,
//! size: u16|u32}` pointing at `.dat` records of the form `key '\n'
//! payload`. Keys are sorted, with two quirks the search honors: record 0
//! may be an out-of-order title entry, and some modules contain zero-size
//! tombstone rows the binary search has to step around.
//!
//! Raw modules keep the entry text directly in `.dat`. Compressed modules
//! store an 8-byte `{block, entry}` locator there instead; the text lives in
//! `.zdt` blocks indexed by `.zdx`, each decompressed block carrying its own
//! entry table `{count: u32} ({start: u32, size: u32}) * count`.
//!
//! External keys are mapped to the module's internal convention before
//! comparing: Strong's numbers gain or lose zero padding and their `G`/`H`
//! prefix, daily-devotion dates become `MM.DD`, everything else upper-cases.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use tracing::warn;

use lectern_core::bytes::decode_u32_le;
use lectern_core::Charset;
use lectern_crypto::decipher_in_place;

use crate::backend::{prefixed, BlockCache};
use crate::codec::{codec_for_name, Codec};
use crate::entry::{DataEntry, DataIndex};
use crate::error::{Result, StorageError};
use crate::module_file::ModuleFile;
use crate::session::{KeyPolicy, ModuleSpec};

/// Alias chains deeper than this are treated as broken. The storage format
/// allows a link entry to point at another link, or at itself; real modules
/// use a single hop.
const MAX_LINK_DEPTH: usize = 4;

/// The sorted key table both dictionary variants search: `.idx` + `.dat`.
struct KeyIndex {
    index: ModuleFile,
    data: ModuleFile,
    datasize: u8,
    charset: Charset,
    policy: KeyPolicy,
    initials: String,
}

impl KeyIndex {
    fn open(spec: &ModuleSpec, datasize: u8) -> Result<KeyIndex> {
        if datasize != 2 && datasize != 4 {
            return Err(StorageError::UnsupportedLayout(format!(
                "dictionary datasize {datasize}"
            )));
        }
        Ok(KeyIndex {
            index: ModuleFile::open(&prefixed(spec, "idx"))?,
            data: ModuleFile::open(&prefixed(spec, "dat"))?,
            datasize,
            charset: Charset::resolve(spec.charset.as_deref()),
            policy: spec.keys.clone(),
            initials: spec.initials.clone(),
        })
    }

    fn cardinality(&self) -> usize {
        self.index.len() / (4 + self.datasize as usize)
    }

    fn index_row(&self, row: u32) -> DataIndex {
        DataIndex::read_row(&self.index, row, self.datasize)
    }

    fn entry_for(&self, index: DataIndex) -> DataEntry {
        let record = self.data.read_at(index.offset as usize, index.size as usize);
        DataEntry::parse(record, self.charset)
    }

    fn entry_at(&self, row: u32) -> DataEntry {
        self.entry_for(self.index_row(row))
    }

    /// The externally presented key of a row, `None` past the table.
    fn key_at(&self, row: usize) -> Option<String> {
        if row >= self.cardinality() {
            return None;
        }
        let internal = self.entry_at(row as u32).key();
        Some(internal_to_external(&self.policy, &internal))
    }

    /// Binary-search for an external key. Non-negative results are the
    /// matching row; a miss encodes the insertion point as
    /// `-(insertion + 1)`.
    ///
    /// Record 0 is excluded from the ordered range (it may be an
    /// out-of-order title) and checked separately after a miss. Zero-size
    /// tombstone rows cannot be compared; the probe steps over them toward
    /// the wider half of the remaining window, giving up on the whole probe
    /// when it runs into the window edge.
    fn search(&self, external: &str) -> isize {
        let total = self.cardinality() as isize;
        let mut low: isize = 0;
        let mut high: isize = total;

        while high - low > 1 {
            let mid = (low + high) >> 1;
            let step: isize = if mid - low >= high - mid { -1 } else { 1 };
            let mut probe = mid;
            let mut row = self.index_row(probe as u32);
            while row.size == 0 {
                probe += step;
                if probe <= low || probe >= high {
                    return self.missed(external, high);
                }
                row = self.index_row(probe as u32);
            }

            let entry_key = self.entry_for(row).key();
            let target = normalize(
                &self.policy,
                &external_to_internal(&self.policy, &self.initials, external, &entry_key),
            );
            match normalize(&self.policy, &entry_key).cmp(&target) {
                Ordering::Less => low = probe,
                Ordering::Greater => high = probe,
                Ordering::Equal => return probe,
            }
        }
        self.missed(external, high)
    }

    /// Miss path: the title-record exception, then the case-sensitive
    /// linear rescue, then the insertion-point encoding.
    fn missed(&self, external: &str, high: isize) -> isize {
        let total = self.cardinality();
        if total > 0 {
            let entry_key = self.entry_at(0).key();
            let target = normalize(
                &self.policy,
                &external_to_internal(&self.policy, &self.initials, external, &entry_key),
            );
            if normalize(&self.policy, &entry_key) == target {
                return 0;
            }
        }
        // Keys the fold-insensitive order cannot reach are still findable
        // by their exact spelling.
        if self.policy.case_sensitive {
            for row in 0..total {
                if self.entry_at(row as u32).key() == external {
                    return row as isize;
                }
            }
        }
        -(high + 1)
    }
}

/// An open uncompressed dictionary.
pub struct RawDictSession {
    keys: KeyIndex,
    cipher_key: Option<Vec<u8>>,
}

impl RawDictSession {
    pub fn open(spec: &ModuleSpec, datasize: u8) -> Result<RawDictSession> {
        Ok(RawDictSession {
            keys: KeyIndex::open(spec, datasize)?,
            cipher_key: spec.cipher().map(<[u8]>::to_vec),
        })
    }

    /// Number of index rows, tombstones and title record included.
    pub fn cardinality(&self) -> usize {
        self.keys.cardinality()
    }

    /// See [`KeyIndex::search`]: row index, or `-(insertion + 1)`.
    pub fn search(&self, key: &str) -> isize {
        self.keys.search(key)
    }

    /// The externally presented key of a row, `None` past the table.
    pub fn key_at(&self, row: usize) -> Option<String> {
        self.keys.key_at(row)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.search(key) >= 0
    }

    /// The matched record's stored size, 0 on a miss.
    pub fn length(&self, key: &str) -> u32 {
        match self.keys.search(key) {
            pos if pos >= 0 => self.keys.index_row(pos as u32).size,
            _ => 0,
        }
    }

    /// Resolve and read an entry. Misses read as empty; aliases are chased
    /// to the entry they name.
    pub fn read(&self, key: &str) -> String {
        match resolve_entry(&self.keys, key) {
            Some(entry) => entry.raw_text(self.cipher_key.as_deref()),
            None => String::new(),
        }
    }

    /// Every key in row order, as externally presented.
    pub fn global_key_list(&self) -> Vec<String> {
        (0..self.cardinality()).filter_map(|row| self.keys.key_at(row)).collect()
    }
}

/// An open block-compressed dictionary.
///
/// The key table works exactly as in [`RawDictSession`]; each `.dat` record
/// holds a `{block, entry}` locator instead of text.
pub struct ZDictSession {
    keys: KeyIndex,
    block_index: ModuleFile,
    block_data: ModuleFile,
    codec: Box<dyn Codec>,
    cache: BlockCache,
    cipher_key: Option<Vec<u8>>,
}

impl ZDictSession {
    pub fn open(spec: &ModuleSpec) -> Result<ZDictSession> {
        Ok(ZDictSession {
            keys: KeyIndex::open(spec, 4)?,
            block_index: ModuleFile::open(&prefixed(spec, "zdx"))?,
            block_data: ModuleFile::open(&prefixed(spec, "zdt"))?,
            codec: codec_for_name(spec.codec.as_deref().unwrap_or("ZIP"))?,
            cache: BlockCache::new(),
            cipher_key: spec.cipher().map(<[u8]>::to_vec),
        })
    }

    /// Number of index rows, tombstones and title record included.
    pub fn cardinality(&self) -> usize {
        self.keys.cardinality()
    }

    /// See [`KeyIndex::search`]: row index, or `-(insertion + 1)`.
    pub fn search(&self, key: &str) -> isize {
        self.keys.search(key)
    }

    /// The externally presented key of a row, `None` past the table.
    pub fn key_at(&self, row: usize) -> Option<String> {
        self.keys.key_at(row)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.search(key) >= 0
    }

    /// The matched record's stored size (the locator, not the text), 0 on a
    /// miss.
    pub fn length(&self, key: &str) -> u32 {
        match self.keys.search(key) {
            pos if pos >= 0 => self.keys.index_row(pos as u32).size,
            _ => 0,
        }
    }

    /// Resolve a key to its locator and read the text out of the entry's
    /// block, decompressing only on a cache miss.
    pub fn read(&mut self, key: &str) -> Result<String> {
        let Some(entry) = resolve_entry(&self.keys, key) else {
            return Ok(String::new());
        };
        let Some(locator) = entry.block_locator() else {
            warn!(key, "dictionary record too short for a block locator");
            return Ok(String::new());
        };
        let block = locator.offset;
        let block_entry = locator.size;

        if !self.cache.holds(block, None) {
            let row = self.block_index.read_at(block as usize * 8, 8);
            if row.len() < 8 {
                warn!(key, block, "compressed block row missing");
                return Ok(String::new());
            }
            let start = decode_u32_le(&row, 0);
            let size = decode_u32_le(&row, 4);
            let mut packed = self.block_data.read_at(start as usize, size as usize);
            if let Some(cipher) = &self.cipher_key {
                decipher_in_place(cipher, &mut packed);
            }
            let unpacked = self.codec.uncompress(&packed, None)?;
            self.cache.fill(block, None, unpacked);
        }

        // The block opens with its own entry table:
        // {count: u32} ({start: u32, size: u32}) * count.
        let bytes = self.cache.bytes();
        if bytes.len() < 4 {
            warn!(key, block, "decompressed block too short for an entry table");
            return Ok(String::new());
        }
        let entry_count = decode_u32_le(bytes, 0);
        if block_entry >= entry_count {
            warn!(key, block, entry = block_entry, count = entry_count, "block entry out of range");
            return Ok(String::new());
        }
        let slot = 4 + 8 * block_entry as usize;
        if slot + 8 > bytes.len() {
            warn!(key, block, entry = block_entry, "block entry table truncated");
            return Ok(String::new());
        }
        let entry_start = decode_u32_le(bytes, slot) as usize;
        let entry_size = decode_u32_le(bytes, slot + 4) as usize;
        let end = entry_start + entry_size;
        if end > bytes.len() {
            warn!(key, block, entry = block_entry, "block entry outside its block");
            return Ok(String::new());
        }

        // Entries are NUL terminated inside the block; strip that along
        // with surrounding whitespace.
        let text = self.keys.charset.decode(&bytes[entry_start..end]);
        Ok(text.trim_matches(|c: char| c <= ' ').to_string())
    }

    /// Every key in row order, as externally presented.
    pub fn global_key_list(&self) -> Vec<String> {
        (0..self.cardinality()).filter_map(|row| self.keys.key_at(row)).collect()
    }
}

/// Follow a key through at most [`MAX_LINK_DEPTH`] aliases to a non-link
/// entry. A miss at any hop resolves to `None`.
fn resolve_entry(keys: &KeyIndex, external: &str) -> Option<DataEntry> {
    let mut key = external.to_string();
    for _ in 0..=MAX_LINK_DEPTH {
        let pos = keys.search(&key);
        if pos < 0 {
            return None;
        }
        let entry = keys.entry_at(pos as u32);
        if !entry.is_link_entry() {
            return Some(entry);
        }
        key = entry.link_target();
    }
    warn!(key = external, "alias chain deeper than {MAX_LINK_DEPTH}, giving up");
    None
}

/// Fold an internal key for ordered comparison: upper-case, unless the
/// module declares case-sensitive keys or keys are dates.
fn normalize(policy: &KeyPolicy, internal: &str) -> String {
    if policy.case_sensitive || policy.daily_devotion {
        internal.to_string()
    } else {
        internal.to_uppercase()
    }
}

/// Map an external key to the module's internal convention. `pattern` is a
/// key already stored by the module, used to detect which zero-padding
/// scheme its Strong's numbers follow.
fn external_to_internal(
    policy: &KeyPolicy,
    initials: &str,
    external: &str,
    pattern: &str,
) -> String {
    if policy.daily_devotion {
        return match parse_devotion_date(external) {
            Some((month, day)) => format!("{month:02}.{day:02}"),
            None => external.to_string(),
        };
    }
    if policy.greek_definitions || policy.hebrew_definitions {
        return strongs_internal(policy, initials, external, pattern);
    }
    external.to_uppercase()
}

/// Present an internal key externally. Date keys render unpadded (`3.14`);
/// everything else is stored in its presentation form already.
fn internal_to_external(policy: &KeyPolicy, internal: &str) -> String {
    if policy.daily_devotion && internal.len() >= 3 {
        if let Some((month, day)) = internal.split_once('.') {
            if let (Ok(month), Ok(day)) = (month.parse::<u32>(), day.parse::<u32>()) {
                return format!("{month}.{day}");
            }
        }
    }
    internal.to_string()
}

/// Normalize a Strong's number reference.
///
/// Both-testament modules key as `G`/`H` plus the number; single-testament
/// modules key as the bare number. Padding width follows the module: 4
/// digits when the pattern key uses 4, otherwise 5, and none at all when
/// the module declares padding off. A trailing letter (optionally `!`
/// prefixed) is stripped; the `naslex` module alone keeps the letter,
/// upper-cased.
fn strongs_internal(policy: &KeyPolicy, initials: &str, external: &str, pattern: &str) -> String {
    static STRONGS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^([GH])(\d+)((!)?([a-z])?)$").expect("valid regex"));

    let Some(caps) = STRONGS.captures(external) else {
        return external.to_uppercase();
    };
    let Ok(number) = caps[2].parse::<u32>() else {
        return external.to_uppercase();
    };
    let trailing_letter = caps
        .get(5)
        .and_then(|letter| letter.as_str().chars().next());

    let padded = if policy.strongs_padding {
        let width = if pattern.chars().filter(|c| c.is_ascii_digit()).count() == 4 {
            4
        } else {
            5
        };
        format!("{number:0width$}")
    } else {
        number.to_string()
    };

    if policy.greek_definitions && policy.hebrew_definitions {
        let mut key = String::with_capacity(padded.len() + 2);
        key.push_str(&caps[1]);
        key.push_str(&padded);
        if initials.eq_ignore_ascii_case("naslex") {
            if let Some(letter) = trailing_letter {
                key.push(letter.to_ascii_uppercase());
            }
        }
        key
    } else {
        padded
    }
}

/// Accepted date spellings: `M.D`, `M/D`, `M-D`, and an English month name
/// (full or three-letter) followed by the day.
fn parse_devotion_date(external: &str) -> Option<(u32, u32)> {
    let text = external.trim();
    for sep in ['.', '/', '-'] {
        if let Some((month, day)) = text.split_once(sep) {
            if let (Ok(month), Ok(day)) = (
                month.trim().parse::<u32>(),
                day.trim().parse::<u32>(),
            ) {
                return check_month_day(month, day);
            }
        }
    }
    let (name, day) = text.rsplit_once(' ')?;
    let day = day.trim().parse::<u32>().ok()?;
    check_month_day(month_number(name.trim())?, day)
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let name = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|month| name == *month || name == month[..3])
        .map(|i| i as u32 + 1)
}

fn check_month_day(month: u32, day: u32) -> Option<(u32, u32)> {
    ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some((month, day))
}
