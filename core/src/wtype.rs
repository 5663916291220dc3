// core/src/wtype.rs
//
// Word-type tags carried by dictionary words.
// The splitter only looks at a handful of them: part of speech, noun
// subclass, numeral scale, conjugation form and the sahen / verb-suffix
// flags. `Cos` ids feed the feature numbering and must stay stable.

use serde::{Deserialize, Serialize};

/// Part of speech of a dictionary word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pos {
    #[default]
    None,
    Noun,
    /// Particle
    Prt,
    /// Auxiliary verb
    Xv,
    /// Verb
    V,
    /// Adjective
    A,
    /// Adjectival verb (na-adjective)
    Ajv,
    /// Adverb
    Av,
    /// Adnominal
    Me,
    Conj,
    /// Interjection
    Ij,
    Pre,
    Suc,
    Token,
    /// Adjective-forming suffix ("-yasui", "-nikui")
    D2ky,
    /// Noun-like word that behaves as a noun before dependents
    N2t,
    Number,
    Inval,
    /// Opening bracket
    Open,
    /// Closing bracket
    Close,
}

/// Noun subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum Cos {
    #[default]
    None = 0,
    /// Place name
    Cn = 1,
    /// Organisation name
    Kk = 2,
    /// Person name
    Jn = 3,
    Suffix = 4,
    /// Numeral noun
    Nn = 5,
    Prefix = 6,
    Postfix = 7,
    /// Suffix attaching to sahen nouns
    SvSuffix = 8,
    /// Place-name suffix
    CnSuffix = 9,
}

/// Number of noun subclasses (size of the noun-subclass feature range).
pub const COS_NR: i32 = 10;

impl Cos {
    /// Stable numeric id used by the feature encoder.
    pub const fn id(self) -> i32 {
        self as i32
    }
}

/// Scale of a numeral word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scos {
    #[default]
    None,
    /// ones (ichi, ni, ...)
    N1,
    /// tens (juu)
    N10,
    /// hundreds (hyaku)
    N100,
    /// thousands (sen)
    N1000,
    /// ten-thousand and above (man, oku, chou)
    N10000,
    Other,
}

/// Conjugation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConjType {
    #[default]
    None,
    Mizen,
    /// Continuative form
    Renyou,
    Syuusi,
    Rentai,
    Katei,
    Meirei,
    Gokan,
}

/// Full word type of a dictionary word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WordType {
    pub pos: Pos,
    pub cos: Cos,
    pub scos: Scos,
    pub ct: ConjType,
    /// Sahen noun (can take "suru")
    pub sv: bool,
    /// Verb-forming suffix ("-naosu", "-hajimeru")
    pub vsuffix: bool,
}

impl WordType {
    /// The empty word type (no part of speech).
    pub const NONE: WordType = WordType {
        pos: Pos::None,
        cos: Cos::None,
        scos: Scos::None,
        ct: ConjType::None,
        sv: false,
        vsuffix: false,
    };

    pub const fn new(pos: Pos) -> Self {
        Self {
            pos,
            ..Self::NONE
        }
    }

    pub const fn noun() -> Self {
        Self::new(Pos::Noun)
    }

    /// A numeral of the given scale.
    pub const fn number(scos: Scos) -> Self {
        Self {
            pos: Pos::Number,
            cos: Cos::Nn,
            scos,
            ..Self::NONE
        }
    }

    /// A verb whose last inflecting element is in form `ct`.
    pub const fn verb(ct: ConjType) -> Self {
        Self {
            pos: Pos::V,
            ct,
            ..Self::NONE
        }
    }

    pub const fn with_cos(mut self, cos: Cos) -> Self {
        self.cos = cos;
        self
    }

    pub const fn with_scos(mut self, scos: Scos) -> Self {
        self.scos = scos;
        self
    }

    pub const fn with_ct(mut self, ct: ConjType) -> Self {
        self.ct = ct;
        self
    }

    pub const fn sahen(mut self) -> Self {
        self.sv = true;
        self
    }

    pub const fn verb_suffix(mut self) -> Self {
        self.vsuffix = true;
        self
    }

    pub fn is_none(&self) -> bool {
        self.pos == Pos::None
    }
}
