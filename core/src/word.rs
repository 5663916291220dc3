//! Word matches produced by dictionary lookup.
//!
//! A `WordMatch` covers a span of the input starting at some position and
//! is made of up to four parts, in reading order: prefix, core word,
//! dependent words (particles, auxiliaries) and postfix. Only the lengths
//! and tags of the parts matter to the splitter; surface forms belong to
//! the candidate layer.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::feature::WORD_HASH_MAX;
use crate::segclass::{DepClass, SegClass};
use crate::wtype::{ConjType, Pos, WordType};

bitflags! {
    /// Boolean features of a meta-word, mirrored into the feature list
    /// during scoring.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MwFeatures: u32 {
        /// Core is a sahen noun
        const SV = 0x0001;
        /// Weak connection between core and dependents
        const WEAK_CONN = 0x0002;
        /// Prefix or postfix attached
        const SUFFIX = 0x0004;
        const NUM = 0x0008;
        /// One-character core
        const CORE1 = 0x0010;
        /// Two-character core
        const CORE2 = 0x0020;
        const SEG1 = 0x0040;
        const SEG2 = 0x0080;
        const SEG3 = 0x0100;
        /// No core word, dependents only
        const DEP_ONLY = 0x0200;
        /// Comes from a learned idiom
        const OCHAIRE = 0x0400;
        const HIGH_FREQ = 0x0800;
    }
}

/// Which of the four parts of a word match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Prefix = 0,
    Core = 1,
    DepWord = 2,
    Postfix = 3,
}

pub const NR_PARTS: usize = 4;

/// One part of a word match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WordPart {
    pub len: usize,
    pub wt: WordType,
    pub dc: DepClass,
}

/// One segment of a compound decomposition: the reading length it covers
/// and its surface text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundSegment {
    pub len: usize,
    pub text: String,
}

/// A decomposition of a compound core word into segments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompoundEntry {
    pub segments: Vec<CompoundSegment>,
}

impl CompoundEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(mut self, len: usize, text: S) -> Self {
        self.segments.push(CompoundSegment {
            len,
            text: text.into(),
        });
        self
    }

    /// Total reading length of all segments.
    pub fn reading_len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum()
    }
}

/// A dictionary match starting at `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordMatch {
    pub from: usize,
    /// Sum of the part lengths.
    pub len: usize,
    pub parts: [WordPart; NR_PARTS],
    pub head_pos: Pos,
    /// Conjugation form of the last inflecting word.
    pub tail_ct: ConjType,
    pub weak: bool,
    pub dep_word_hash: i32,
    pub compounds: Vec<CompoundEntry>,
    /// Filled in by the word-list expander.
    pub seg_class: SegClass,
    /// Filled in by the word-list expander.
    pub mw_features: MwFeatures,
}

impl WordMatch {
    /// A match consisting of a core word of `core_len` characters.
    ///
    /// Head part of speech and tail conjugation default to the core's;
    /// the dependent part starts out empty with class `Raw`.
    pub fn new(from: usize, core_len: usize, core_wt: WordType) -> Self {
        let mut parts = [WordPart::default(); NR_PARTS];
        parts[PartKind::Core as usize] = WordPart {
            len: core_len,
            wt: core_wt,
            dc: DepClass::None,
        };
        parts[PartKind::DepWord as usize].dc = DepClass::Raw;
        Self {
            from,
            len: core_len,
            parts,
            head_pos: core_wt.pos,
            tail_ct: core_wt.ct,
            weak: false,
            dep_word_hash: 0,
            compounds: Vec::new(),
            seg_class: SegClass::Head,
            mw_features: MwFeatures::empty(),
        }
    }

    fn set_part(&mut self, kind: PartKind, part: WordPart) {
        let slot = &mut self.parts[kind as usize];
        self.len = self.len - slot.len + part.len;
        *slot = part;
    }

    pub fn with_prefix(mut self, len: usize, wt: WordType) -> Self {
        self.set_part(
            PartKind::Prefix,
            WordPart {
                len,
                wt,
                dc: DepClass::None,
            },
        );
        self
    }

    /// Attach dependent words of `len` characters ending in class `dc`.
    pub fn with_dep(mut self, len: usize, dc: DepClass) -> Self {
        self.set_part(
            PartKind::DepWord,
            WordPart {
                len,
                wt: WordType::NONE,
                dc,
            },
        );
        self
    }

    pub fn with_postfix(mut self, len: usize, wt: WordType) -> Self {
        self.set_part(
            PartKind::Postfix,
            WordPart {
                len,
                wt,
                dc: DepClass::None,
            },
        );
        self
    }

    pub fn with_compound(mut self, entry: CompoundEntry) -> Self {
        self.compounds.push(entry);
        self
    }

    pub fn with_head_pos(mut self, pos: Pos) -> Self {
        self.head_pos = pos;
        self
    }

    pub fn with_tail_ct(mut self, ct: ConjType) -> Self {
        self.tail_ct = ct;
        self
    }

    pub fn weak_connection(mut self) -> Self {
        self.weak = true;
        self
    }

    pub fn part(&self, kind: PartKind) -> &WordPart {
        &self.parts[kind as usize]
    }

    pub fn core(&self) -> &WordPart {
        self.part(PartKind::Core)
    }

    pub fn is_compound(&self) -> bool {
        !self.compounds.is_empty()
    }

    /// Offset of the first character of `kind` relative to `from`.
    pub fn part_offset(&self, kind: PartKind) -> usize {
        self.parts[..kind as usize].iter().map(|p| p.len).sum()
    }
}

/// Hash of a reading, always non-negative.
pub fn reading_hash(chars: &[char]) -> i32 {
    let mut h: i32 = 0;
    for &c in chars {
        let c = c as i32;
        h = h
            .wrapping_mul(97)
            .wrapping_add(c << 4)
            .wrapping_add(c >> 4);
    }
    // i32::MIN has no positive counterpart
    h.checked_abs().unwrap_or(i32::MAX)
}

/// Hash of a dependent-word reading, in `0..WORD_HASH_MAX`.
pub fn dep_word_hash(chars: &[char]) -> i32 {
    reading_hash(chars) % WORD_HASH_MAX
}
