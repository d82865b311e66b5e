//! Bible books and testaments.
//!
//! [`BibleBook`] is the closed set of books a reference system can order:
//! the 66 protestant-canon books plus three introduction pseudo-books
//! (whole bible, OT, NT) that own ordinal slots of their own. Books are
//! identified externally by their OSIS abbreviation.

use std::fmt;

/// The two halves of a bible module. Raw and compressed verse layouts keep
/// one file set per testament.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Testament {
    Old,
    New,
}

macro_rules! bible_books {
    ($( $variant:ident => $osis:literal ),+ $(,)?) => {
        /// A book addressable by a reference system.
        ///
        /// Declaration order is traditional canon order with the intro
        /// pseudo-books interleaved where their ordinal ranges begin.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum BibleBook {
            $($variant),+
        }

        impl BibleBook {
            /// Every book, in declaration order.
            pub const ALL: &'static [BibleBook] = &[$(BibleBook::$variant),+];

            /// The OSIS abbreviation, e.g. `"Gen"`, `"1Cor"`, `"Intro.NT"`.
            pub fn osis(self) -> &'static str {
                match self {
                    $(BibleBook::$variant => $osis),+
                }
            }
        }
    };
}

bible_books! {
    IntroBible => "Intro.Bible",
    IntroOt => "Intro.OT",
    Gen => "Gen",
    Exod => "Exod",
    Lev => "Lev",
    Num => "Num",
    Deut => "Deut",
    Josh => "Josh",
    Judg => "Judg",
    Ruth => "Ruth",
    Sam1 => "1Sam",
    Sam2 => "2Sam",
    Kgs1 => "1Kgs",
    Kgs2 => "2Kgs",
    Chr1 => "1Chr",
    Chr2 => "2Chr",
    Ezra => "Ezra",
    Neh => "Neh",
    Esth => "Esth",
    Job => "Job",
    Ps => "Ps",
    Prov => "Prov",
    Eccl => "Eccl",
    Song => "Song",
    Isa => "Isa",
    Jer => "Jer",
    Lam => "Lam",
    Ezek => "Ezek",
    Dan => "Dan",
    Hos => "Hos",
    Joel => "Joel",
    Amos => "Amos",
    Obad => "Obad",
    Jonah => "Jonah",
    Mic => "Mic",
    Nah => "Nah",
    Hab => "Hab",
    Zeph => "Zeph",
    Hag => "Hag",
    Zech => "Zech",
    Mal => "Mal",
    IntroNt => "Intro.NT",
    Matt => "Matt",
    Mark => "Mark",
    Luke => "Luke",
    John => "John",
    Acts => "Acts",
    Rom => "Rom",
    Cor1 => "1Cor",
    Cor2 => "2Cor",
    Gal => "Gal",
    Eph => "Eph",
    Phil => "Phil",
    Col => "Col",
    Thess1 => "1Thess",
    Thess2 => "2Thess",
    Tim1 => "1Tim",
    Tim2 => "2Tim",
    Titus => "Titus",
    Phlm => "Phlm",
    Heb => "Heb",
    Jas => "Jas",
    Pet1 => "1Pet",
    Pet2 => "2Pet",
    John1 => "1John",
    John2 => "2John",
    John3 => "3John",
    Jude => "Jude",
    Rev => "Rev",
}

impl BibleBook {
    /// How many distinct books exist.
    pub const COUNT: usize = Self::ALL.len();

    /// Position within [`BibleBook::ALL`]. Stable across runs.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve an OSIS abbreviation, case-insensitively.
    pub fn from_osis(name: &str) -> Option<BibleBook> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.osis().eq_ignore_ascii_case(name))
    }

    /// True for the three introduction pseudo-books.
    pub fn is_intro(self) -> bool {
        matches!(
            self,
            BibleBook::IntroBible | BibleBook::IntroOt | BibleBook::IntroNt
        )
    }
}

impl fmt::Display for BibleBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.osis())
    }
}
