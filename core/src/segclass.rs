//! Segment classes and the classifier that assigns them to word matches.
//!
//! A segment class is a coarse grammatical category of a whole bunsetsu
//! (core word plus its dependents). Lattice transitions are scored on
//! pairs of classes, so the numeric ids below are part of the trained
//! table format and must not be reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::word::{PartKind, WordMatch};
use crate::wtype::{Cos, Pos};

/// Number of segment classes.
pub const SEG_SIZE: usize = 20;

/// Grammatical category of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SegClass {
    /// Start of the sentence
    #[default]
    Head = 0,
    /// End of the sentence
    Tail,
    Bunsetsu,
    Conjunction,
    NounCaseParticle,
    NounEnd,
    VerbDependent,
    VerbEnd,
    Adjective,
    AdjectivalVerb,
    Adverbial,
    Attributive,
    Noun,
    NounDependent,
    NounContinuative,
    VerbContinuative,
    VerbAttributive,
    NounPrefix,
    NounPostfix,
    PlaceNamePostfix,
}

const SEG_CLASSES: [SegClass; SEG_SIZE] = [
    SegClass::Head,
    SegClass::Tail,
    SegClass::Bunsetsu,
    SegClass::Conjunction,
    SegClass::NounCaseParticle,
    SegClass::NounEnd,
    SegClass::VerbDependent,
    SegClass::VerbEnd,
    SegClass::Adjective,
    SegClass::AdjectivalVerb,
    SegClass::Adverbial,
    SegClass::Attributive,
    SegClass::Noun,
    SegClass::NounDependent,
    SegClass::NounContinuative,
    SegClass::VerbContinuative,
    SegClass::VerbAttributive,
    SegClass::NounPrefix,
    SegClass::NounPostfix,
    SegClass::PlaceNamePostfix,
];

// (japanese name, short symbol), indexed by class id
const SEG_NAMES: [(&str, &str); SEG_SIZE] = [
    ("文頭", "H"),
    ("文末", "T"),
    ("文節", "B"),
    ("接続語", "C"),
    ("名詞+格助詞", "Nk"),
    ("名詞+終端", "Ne"),
    ("動詞+付属語", "Vf"),
    ("動詞+終端", "Ve"),
    ("形容詞", "A"),
    ("形容動詞", "AJV"),
    ("連用修飾", "YM"),
    ("連体修飾", "TM"),
    ("名詞", "N"),
    ("名詞+付属語", "Nf"),
    ("名詞+連用", "Ny"),
    ("動詞+連用", "Vy"),
    ("動詞+連体", "Vt"),
    ("名詞接頭辞", "P"),
    ("名詞接尾辞", "S"),
    ("地名接尾辞", "CS"),
];

impl SegClass {
    /// Numeric id (0..SEG_SIZE).
    pub const fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: usize) -> Option<SegClass> {
        SEG_CLASSES.get(id).copied()
    }

    /// All classes in id order.
    pub fn all() -> &'static [SegClass; SEG_SIZE] {
        &SEG_CLASSES
    }

    /// Japanese display name.
    pub fn name(self) -> &'static str {
        SEG_NAMES[self.id()].0
    }

    /// Short symbol ("Nk", "Vy", ...).
    pub fn symbol(self) -> &'static str {
        SEG_NAMES[self.id()].1
    }

    /// Look a class up by its Japanese name. Unknown names give `Bunsetsu`.
    pub fn by_name(name: &str) -> SegClass {
        SEG_NAMES
            .iter()
            .position(|(n, _)| *n == name)
            .and_then(SegClass::from_id)
            .unwrap_or(SegClass::Bunsetsu)
    }
}

impl fmt::Display for SegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How the dependent words of a segment end.
///
/// `Raw` means there are no dependent words at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum DepClass {
    #[default]
    None = 0,
    /// Generic dependent word
    Fuzokugo,
    /// Case particle
    Kakujoshi,
    /// Continuative ending
    Renyou,
    /// Attributive ending
    Rentai,
    /// Sentence end
    End,
    Raw,
}

impl DepClass {
    pub const fn id(self) -> i32 {
        self as i32
    }
}

/// Assign a segment class to a word match.
///
/// The class depends on the head part of speech, the class of the dependent
/// words, and for nouns on the noun subclass.
pub fn classify(wm: &WordMatch) -> SegClass {
    let core = wm.part(PartKind::Core);
    if core.len == 0 {
        return SegClass::Bunsetsu;
    }
    let dc = wm.part(PartKind::DepWord).dc;

    match wm.head_pos {
        Pos::Noun if wm.len == core.len && core.wt.cos == Cos::Prefix => SegClass::NounPrefix,
        Pos::Noun if core.wt.cos == Cos::Postfix => SegClass::NounPostfix,
        Pos::Noun if core.wt.cos == Cos::CnSuffix => SegClass::PlaceNamePostfix,
        Pos::Noun | Pos::Number | Pos::N2t => match dc {
            DepClass::Raw => SegClass::Noun,
            DepClass::End => SegClass::NounEnd,
            DepClass::Renyou => SegClass::NounContinuative,
            DepClass::Kakujoshi => SegClass::NounCaseParticle,
            _ => SegClass::NounDependent,
        },
        Pos::V => match dc {
            DepClass::Raw => SegClass::Bunsetsu,
            DepClass::End => SegClass::VerbEnd,
            DepClass::Renyou => SegClass::VerbContinuative,
            DepClass::Rentai => SegClass::VerbAttributive,
            _ => SegClass::VerbDependent,
        },
        Pos::D2ky | Pos::A => match dc {
            DepClass::Renyou => SegClass::Adverbial,
            DepClass::Rentai => SegClass::Attributive,
            _ => SegClass::Adjective,
        },
        Pos::Ajv => match dc {
            DepClass::Renyou => SegClass::Adverbial,
            DepClass::Rentai => SegClass::Attributive,
            _ => SegClass::AdjectivalVerb,
        },
        Pos::Av => SegClass::Adverbial,
        Pos::Me => SegClass::Attributive,
        Pos::Conj => SegClass::Conjunction,
        Pos::Open | Pos::Close => SegClass::Bunsetsu,
        _ => SegClass::Noun,
    }
}
