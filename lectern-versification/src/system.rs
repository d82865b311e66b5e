//! A reference system: the bidirectional map between verse references and
//! flat ordinals.
//!
//! Every addressable slot, the whole-bible, testament, book and chapter
//! introductions included, owns exactly one ordinal. For a system with an
//! OT and an NT the enumeration runs:
//!
//! ```text
//! 0  Intro.Bible 0:0      whole-bible introduction
//! 1  Intro.OT 0:0         OT introduction
//! 2  Gen 0:0               book introduction
//! 3  Gen 1:0               chapter introduction
//! 4  Gen 1:1
//! ...
//! n  <last OT verse>
//! n+1  Intro.NT 0:0        NT introduction
//! n+2  Matt 0:0
//! ...
//! m  <last NT verse>       = maximum_ordinal()
//! ```
//!
//! Backends never see references directly; they address records by ordinal
//! (or by per-testament ordinal, where `Intro.NT` restarts the count at 1).

use crate::book::{BibleBook, Testament};
use crate::error::{Result, VersificationError};
use std::fmt;

/// A book/chapter/verse triple. Chapter 0 is the book introduction and
/// verse 0 the chapter introduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Verse {
    pub book: BibleBook,
    pub chapter: u32,
    pub verse: u32,
}

impl Verse {
    pub fn new(book: BibleBook, chapter: u32, verse: u32) -> Verse {
        Verse {
            book,
            chapter,
            verse,
        }
    }
}

impl fmt::Display for Verse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// An immutable versification: ordered book list plus per-chapter last-verse
/// tables, with cumulative chapter-start ordinals derived at construction.
pub struct Versification {
    name: String,
    books: Vec<BibleBook>,
    /// `BibleBook::index()` → slot in `books`, `None` when absent.
    positions: [Option<u8>; BibleBook::COUNT],
    /// Per book slot: highest verse number per chapter; index 0 is the
    /// book-introduction pseudo-chapter whose last verse is always 0.
    last_verse: Vec<Vec<u16>>,
    /// Parallel to `last_verse`: the ordinal of verse 0 of each chapter.
    /// Strictly increasing across the whole system.
    chapter_starts: Vec<Vec<u32>>,
    /// Ordinal of the last OT slot. 0 when the system has no NT.
    ot_max_ordinal: u32,
    /// Ordinal of the last slot, `= maximum_ordinal()`.
    nt_max_ordinal: u32,
}

impl Versification {
    /// Assemble a system from per-testament book lists and last-verse
    /// tables. `last_verse_ot[i]` holds, for book `books_ot[i]`, the highest
    /// verse number of each real chapter (chapter 0 is added here). Either
    /// testament may be empty, in which case its introduction pseudo-book
    /// is omitted entirely.
    pub fn new(
        name: &str,
        books_ot: &[BibleBook],
        books_nt: &[BibleBook],
        last_verse_ot: &[&[u16]],
        last_verse_nt: &[&[u16]],
    ) -> Versification {
        debug_assert_eq!(books_ot.len(), last_verse_ot.len());
        debug_assert_eq!(books_nt.len(), last_verse_nt.len());

        let mut books = Vec::with_capacity(3 + books_ot.len() + books_nt.len());
        let mut last_verse: Vec<Vec<u16>> = Vec::with_capacity(books.capacity());

        books.push(BibleBook::IntroBible);
        last_verse.push(vec![0]);

        if !books_ot.is_empty() {
            books.push(BibleBook::IntroOt);
            last_verse.push(vec![0]);
            for (book, chapters) in books_ot.iter().zip(last_verse_ot) {
                books.push(*book);
                let mut row = Vec::with_capacity(chapters.len() + 1);
                row.push(0);
                row.extend_from_slice(chapters);
                last_verse.push(row);
            }
        }

        if !books_nt.is_empty() {
            books.push(BibleBook::IntroNt);
            last_verse.push(vec![0]);
            for (book, chapters) in books_nt.iter().zip(last_verse_nt) {
                books.push(*book);
                let mut row = Vec::with_capacity(chapters.len() + 1);
                row.push(0);
                row.extend_from_slice(chapters);
                last_verse.push(row);
            }
        }

        let mut positions = [None; BibleBook::COUNT];
        for (slot, book) in books.iter().enumerate() {
            positions[book.index()] = Some(slot as u8);
        }

        let mut chapter_starts: Vec<Vec<u32>> = Vec::with_capacity(books.len());
        let mut ordinal: u32 = 0;
        let mut ot_max_ordinal = 0;
        for (slot, row) in last_verse.iter().enumerate() {
            if books[slot] == BibleBook::IntroNt {
                ot_max_ordinal = ordinal - 1;
            }
            let mut starts = Vec::with_capacity(row.len());
            for &verses in row {
                starts.push(ordinal);
                // One slot per verse plus the chapter introduction.
                ordinal += u32::from(verses) + 1;
            }
            chapter_starts.push(starts);
        }
        let nt_max_ordinal = ordinal - 1;

        Versification {
            name: name.to_owned(),
            books,
            positions,
            last_verse,
            chapter_starts,
            ot_max_ordinal,
            nt_max_ordinal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Books of this system, in ordinal order, introductions included.
    pub fn books(&self) -> &[BibleBook] {
        &self.books
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Slot of `book` within this system's book order, if it has one.
    pub fn book_ordinal(&self, book: BibleBook) -> Option<usize> {
        self.positions[book.index()].map(usize::from)
    }

    pub fn contains_book(&self, book: BibleBook) -> bool {
        self.positions[book.index()].is_some()
    }

    pub fn first_book(&self) -> BibleBook {
        self.books[0]
    }

    pub fn last_book(&self) -> BibleBook {
        self.books[self.books.len() - 1]
    }

    /// The book after `book` in system order, `None` at the end or when
    /// `book` is not in the system.
    pub fn next_book(&self, book: BibleBook) -> Option<BibleBook> {
        let slot = self.book_ordinal(book)?;
        self.books.get(slot + 1).copied()
    }

    /// The book before `book` in system order.
    pub fn previous_book(&self, book: BibleBook) -> Option<BibleBook> {
        let slot = self.book_ordinal(book)?;
        Some(self.books[slot.checked_sub(1)?])
    }

    /// Highest chapter number of `book`; 0 when the book is absent.
    pub fn last_chapter(&self, book: BibleBook) -> u32 {
        match self.book_ordinal(book) {
            Some(slot) => (self.last_verse[slot].len() - 1) as u32,
            None => 0,
        }
    }

    /// Highest verse number of `book` `chapter`; 0 when either is absent.
    pub fn last_verse(&self, book: BibleBook, chapter: u32) -> u32 {
        match self.book_ordinal(book) {
            Some(slot) => self.last_verse[slot]
                .get(chapter as usize)
                .copied()
                .map_or(0, u32::from),
            None => 0,
        }
    }

    /// The last ordinal in the system.
    pub fn maximum_ordinal(&self) -> u32 {
        self.nt_max_ordinal
    }

    /// Flat ordinal of an in-range verse. The value is opaque; it is only
    /// meaningful back through [`decode_ordinal`](Self::decode_ordinal).
    /// Verses from a different system decay to 0.
    pub fn ordinal(&self, verse: &Verse) -> u32 {
        match self.book_ordinal(verse.book) {
            Some(slot) => self.chapter_starts[slot][verse.chapter as usize] + verse.verse,
            None => 0,
        }
    }

    /// Ordinal within the verse's own testament. NT ordinals restart at 1
    /// with `Intro.NT`; OT ordinals are unchanged.
    pub fn testament_ordinal(&self, ordinal: u32) -> u32 {
        let nt_start = self.ot_max_ordinal + 1;
        if ordinal >= nt_start {
            ordinal - nt_start + 1
        } else {
            ordinal
        }
    }

    /// Which testament an ordinal falls in.
    pub fn testament(&self, ordinal: u32) -> Testament {
        if ordinal > self.ot_max_ordinal {
            Testament::New
        } else {
            Testament::Old
        }
    }

    /// Count of addressable ordinals in a testament, or in the whole system.
    pub fn count(&self, testament: Option<Testament>) -> u32 {
        let total = self.nt_max_ordinal + 1;
        let ot_count = self.ot_max_ordinal + 1;
        match testament {
            None => total,
            Some(Testament::Old) => ot_count,
            Some(Testament::New) => total - ot_count,
        }
    }

    /// Unwind [`ordinal`](Self::ordinal). Out-of-range input is constrained
    /// to the first or last ordinal of the system.
    pub fn decode_ordinal(&self, ordinal: u32) -> Verse {
        let ord = ordinal.min(self.nt_max_ordinal);

        if ord == 0 {
            return Verse::new(BibleBook::IntroBible, 0, 0);
        }
        if ord == 1 && self.contains_book(BibleBook::IntroOt) {
            return Verse::new(BibleBook::IntroOt, 0, 0);
        }
        if ord == self.ot_max_ordinal + 1 && self.contains_book(BibleBook::IntroNt) {
            return Verse::new(BibleBook::IntroNt, 0, 0);
        }

        let slot = search_starts(ord, self.chapter_starts.len(), |mid| {
            self.chapter_starts[mid][0]
        });
        let chapter = search_starts(ord, self.chapter_starts[slot].len(), |mid| {
            self.chapter_starts[slot][mid]
        });
        let verse = if chapter == 0 {
            0
        } else {
            ord - self.chapter_starts[slot][chapter]
        };
        Verse::new(self.books[slot], chapter as u32, verse)
    }

    /// Check that a reference is inside the system's tables. Chapter 0 and
    /// verse 0 (introductions) are in range.
    pub fn validate(&self, book: BibleBook, chapter: i32, verse: i32) -> Result<()> {
        let max_chapter = self.last_chapter(book);
        if chapter < 0 || chapter as u32 > max_chapter {
            return Err(VersificationError::OutOfRange {
                book,
                chapter,
                verse,
                part: "chapter",
                limit: max_chapter,
            });
        }

        let max_verse = self.last_verse(book, chapter as u32);
        if verse < 0 || verse as u32 > max_verse {
            return Err(VersificationError::OutOfRange {
                book,
                chapter,
                verse,
                part: "verse",
                limit: max_verse,
            });
        }
        Ok(())
    }

    /// Repair an out-of-range reference by rolling the excess forward:
    /// excess chapters walk into following books, excess verses into
    /// following chapters (and books). Negative parts clamp to 0; running
    /// off the end of the system clamps to its very last verse.
    pub fn patch(&self, book: BibleBook, chapter: i32, verse: i32) -> Verse {
        let mut book = book;
        let mut chapter = chapter.max(0) as u32;
        let mut verse = verse.max(0) as u32;

        while chapter > self.last_chapter(book) {
            chapter -= self.last_chapter(book) + 1;
            book = match self.next_book(book) {
                Some(next) => next,
                None => return self.end_of_system(),
            };
        }

        while verse > self.last_verse(book, chapter) {
            verse -= self.last_verse(book, chapter) + 1;
            chapter += 1;

            if chapter > self.last_chapter(book) {
                chapter -= self.last_chapter(book) + 1;
                book = match self.next_book(book) {
                    Some(next) => next,
                    None => return self.end_of_system(),
                };
            }
        }

        Verse::new(book, chapter, verse)
    }

    fn end_of_system(&self) -> Verse {
        let book = self.last_book();
        let chapter = self.last_chapter(book);
        Verse::new(book, chapter, self.last_verse(book, chapter))
    }
}

impl fmt::Debug for Versification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Versification")
            .field("name", &self.name)
            .field("books", &self.books.len())
            .field("ot_max_ordinal", &self.ot_max_ordinal)
            .field("nt_max_ordinal", &self.nt_max_ordinal)
            .finish()
    }
}

/// Binary search over strictly-increasing chapter starts: the largest index
/// whose start is `<= ord`, by exact match or by narrowing to `low`.
fn search_starts(ord: u32, len: usize, start_at: impl Fn(usize) -> u32) -> usize {
    let mut low = 0;
    let mut high = len;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        let start = start_at(mid);
        if start < ord {
            low = mid;
        } else if start > ord {
            high = mid;
        } else {
            return mid;
        }
    }
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two tiny OT books and one NT book:
    ///   Gen [2, 3] verses, Exod [1], Matt [2].
    fn make_system() -> Versification {
        Versification::new(
            "Tiny",
            &[BibleBook::Gen, BibleBook::Exod],
            &[BibleBook::Matt],
            &[&[2, 3], &[1]],
            &[&[2]],
        )
    }

    #[test]
    fn test_book_order_includes_intros() {
        let v = make_system();
        assert_eq!(
            v.books(),
            &[
                BibleBook::IntroBible,
                BibleBook::IntroOt,
                BibleBook::Gen,
                BibleBook::Exod,
                BibleBook::IntroNt,
                BibleBook::Matt,
            ]
        );
        assert_eq!(v.first_book(), BibleBook::IntroBible);
        assert_eq!(v.last_book(), BibleBook::Matt);
        assert!(!v.contains_book(BibleBook::Rev));
    }

    #[test]
    fn test_ordinal_layout() {
        let v = make_system();
        // IntroBible=0, IntroOt=1, Gen 0:0=2, Gen 1:0=3, Gen 1:1=4 ...
        assert_eq!(v.ordinal(&Verse::new(BibleBook::IntroBible, 0, 0)), 0);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::Gen, 0, 0)), 2);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::Gen, 1, 1)), 4);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::Gen, 2, 3)), 9);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::Exod, 1, 1)), 12);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::IntroNt, 0, 0)), 13);
        assert_eq!(v.ordinal(&Verse::new(BibleBook::Matt, 1, 2)), 17);
        assert_eq!(v.maximum_ordinal(), 17);
    }

    #[test]
    fn test_decode_specials() {
        let v = make_system();
        assert_eq!(
            v.decode_ordinal(0),
            Verse::new(BibleBook::IntroBible, 0, 0)
        );
        assert_eq!(v.decode_ordinal(1), Verse::new(BibleBook::IntroOt, 0, 0));
        assert_eq!(v.decode_ordinal(13), Verse::new(BibleBook::IntroNt, 0, 0));
    }

    #[test]
    fn test_decode_clamps_out_of_range() {
        let v = make_system();
        assert_eq!(
            v.decode_ordinal(9999),
            Verse::new(BibleBook::Matt, 1, 2)
        );
    }

    #[test]
    fn test_round_trip_every_ordinal() {
        let v = make_system();
        for ord in 0..=v.maximum_ordinal() {
            let verse = v.decode_ordinal(ord);
            assert_eq!(v.ordinal(&verse), ord, "round trip failed at {verse}");
        }
    }

    #[test]
    fn test_decode_is_strictly_monotonic() {
        let v = make_system();
        let mut prev = None;
        for ord in 0..=v.maximum_ordinal() {
            let verse = v.decode_ordinal(ord);
            let key = (v.book_ordinal(verse.book), verse.chapter, verse.verse);
            if let Some(p) = prev {
                assert!(key > p, "ordinal {ord} did not advance");
            }
            prev = Some(key);
        }
    }

    #[test]
    fn test_testament_split() {
        let v = make_system();
        assert_eq!(v.testament(12), Testament::Old);
        assert_eq!(v.testament(13), Testament::New);
        // Intro.NT restarts the per-testament count at 1.
        assert_eq!(v.testament_ordinal(12), 12);
        assert_eq!(v.testament_ordinal(13), 1);
        assert_eq!(v.testament_ordinal(14), 2);
        assert_eq!(v.count(Some(Testament::Old)), 13);
        assert_eq!(v.count(Some(Testament::New)), 5);
        assert_eq!(v.count(None), 18);
    }

    #[test]
    fn test_validate() {
        let v = make_system();
        assert!(v.validate(BibleBook::Gen, 0, 0).is_ok());
        assert!(v.validate(BibleBook::Gen, 2, 3).is_ok());
        assert!(v.validate(BibleBook::Gen, 3, 0).is_err());
        assert!(v.validate(BibleBook::Gen, 1, 3).is_err());
        assert!(v.validate(BibleBook::Gen, -1, 0).is_err());
        // A book outside the system only admits 0:0.
        assert!(v.validate(BibleBook::Rev, 0, 0).is_ok());
        assert!(v.validate(BibleBook::Rev, 1, 0).is_err());
    }

    #[test]
    fn test_patch_rolls_verse_into_next_chapter() {
        let v = make_system();
        // Gen 1 tops out at verse 2; one past rolls to the chapter-2 intro.
        assert_eq!(
            v.patch(BibleBook::Gen, 1, 3),
            Verse::new(BibleBook::Gen, 2, 0)
        );
        assert_eq!(
            v.patch(BibleBook::Gen, 1, 4),
            Verse::new(BibleBook::Gen, 2, 1)
        );
    }

    #[test]
    fn test_patch_rolls_chapter_into_next_book() {
        let v = make_system();
        // Gen has chapters 0..=2, so chapter 3 is Exod's chapter 0.
        assert_eq!(
            v.patch(BibleBook::Gen, 3, 0),
            Verse::new(BibleBook::Exod, 0, 0)
        );
    }

    #[test]
    fn test_patch_clamps_negatives() {
        let v = make_system();
        assert_eq!(
            v.patch(BibleBook::Gen, -4, -2),
            Verse::new(BibleBook::Gen, 0, 0)
        );
    }

    #[test]
    fn test_patch_clamps_past_end() {
        let v = make_system();
        assert_eq!(
            v.patch(BibleBook::Matt, 99, 99),
            Verse::new(BibleBook::Matt, 1, 2)
        );
        assert_eq!(
            v.patch(BibleBook::Gen, 1, 9999),
            Verse::new(BibleBook::Matt, 1, 2)
        );
    }

    #[test]
    fn test_ot_only_system() {
        let v = Versification::new("OtOnly", &[BibleBook::Gen], &[], &[&[2]], &[]);
        assert_eq!(
            v.books(),
            &[BibleBook::IntroBible, BibleBook::IntroOt, BibleBook::Gen]
        );
        assert_eq!(v.maximum_ordinal(), 5);
        for ord in 0..=v.maximum_ordinal() {
            assert_eq!(v.ordinal(&v.decode_ordinal(ord)), ord);
        }
    }

    #[test]
    fn test_nt_only_system() {
        let v = Versification::new("NtOnly", &[], &[BibleBook::Matt], &[], &[&[2]]);
        assert_eq!(
            v.books(),
            &[BibleBook::IntroBible, BibleBook::IntroNt, BibleBook::Matt]
        );
        // Ordinal 1 is the NT introduction; there is no OT one to claim it.
        assert_eq!(v.decode_ordinal(1), Verse::new(BibleBook::IntroNt, 0, 0));
        for ord in 0..=v.maximum_ordinal() {
            assert_eq!(v.ordinal(&v.decode_ordinal(ord)), ord);
        }
    }

    #[test]
    fn test_book_navigation() {
        let v = make_system();
        assert_eq!(v.next_book(BibleBook::Gen), Some(BibleBook::Exod));
        assert_eq!(v.next_book(BibleBook::Exod), Some(BibleBook::IntroNt));
        assert_eq!(v.next_book(BibleBook::Matt), None);
        assert_eq!(v.previous_book(BibleBook::Gen), Some(BibleBook::IntroOt));
        assert_eq!(v.previous_book(BibleBook::IntroBible), None);
        assert_eq!(v.next_book(BibleBook::Rev), None);
    }
}
