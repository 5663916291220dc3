//! Per-position word lists.
//!
//! For every position of the buffer the dictionary is asked for the
//! matches starting there. Each match is validated and decorated with its
//! segment class and meta-word feature flags before meta-words are built
//! from it.

use crate::dictionary::WordLookup;
use crate::segclass::classify;
use crate::word::{dep_word_hash, MwFeatures, PartKind, WordMatch};
use crate::wtype::Pos;

/// Address of a word match: start position and index in that position's
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordRef {
    pub pos: u32,
    pub idx: u32,
}

#[derive(Debug, Clone, Default)]
pub struct WordLists {
    lists: Vec<Vec<WordMatch>>,
}

impl WordLists {
    /// Query `lookup` at every position of `buffer`.
    pub fn build(buffer: &[char], lookup: &dyn WordLookup) -> Self {
        let mut lists = Vec::with_capacity(buffer.len());
        for from in 0..buffer.len() {
            let mut here = Vec::new();
            for mut wm in lookup.lookup(buffer, from) {
                if wm.from != from || wm.len == 0 || from + wm.len > buffer.len() {
                    tracing::warn!(
                        position = from,
                        word_from = wm.from,
                        word_len = wm.len,
                        "dropping word match outside its slot"
                    );
                    continue;
                }
                decorate(&mut wm, buffer);
                here.push(wm);
            }
            lists.push(here);
        }
        let total: usize = lists.iter().map(|l| l.len()).sum();
        tracing::debug!(chars = buffer.len(), words = total, "built word lists");
        Self { lists }
    }

    pub fn at(&self, pos: usize) -> &[WordMatch] {
        self.lists.get(pos).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn get(&self, r: WordRef) -> &WordMatch {
        &self.lists[r.pos as usize][r.idx as usize]
    }

    /// References to every match starting at `pos`.
    pub fn refs_at(&self, pos: usize) -> impl Iterator<Item = WordRef> + '_ {
        (0..self.at(pos).len()).map(move |idx| WordRef {
            pos: pos as u32,
            idx: idx as u32,
        })
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fill in segment class, feature flags and the dependent-word hash.
pub fn decorate(wm: &mut WordMatch, buffer: &[char]) {
    let core = *wm.core();
    let mut f = MwFeatures::empty();

    if core.wt.pos == Pos::Noun && core.wt.sv {
        f |= MwFeatures::SV;
    }
    if wm.part(PartKind::Prefix).len > 0 || wm.part(PartKind::Postfix).len > 0 {
        f |= MwFeatures::SUFFIX;
    }
    if core.wt.pos == Pos::Number {
        f |= MwFeatures::NUM;
    }
    match core.len {
        0 => f |= MwFeatures::DEP_ONLY,
        1 => f |= MwFeatures::CORE1,
        2 => f |= MwFeatures::CORE2,
        _ => {}
    }
    match wm.len {
        1 => f |= MwFeatures::SEG1,
        2 => f |= MwFeatures::SEG2,
        3 => f |= MwFeatures::SEG3,
        _ => {}
    }
    if wm.weak {
        f |= MwFeatures::WEAK_CONN;
    }
    wm.mw_features |= f;

    let dep = wm.part(PartKind::DepWord).len;
    if wm.dep_word_hash == 0 && dep > 0 {
        let start = wm.from + wm.part_offset(PartKind::DepWord);
        wm.dep_word_hash = dep_word_hash(&buffer[start..start + dep]);
    }
    wm.seg_class = classify(wm);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::MemoryDictionary;
    use crate::segclass::{DepClass, SegClass};
    use crate::wtype::{Cos, Scos, WordType};

    struct Misplaced;

    impl WordLookup for Misplaced {
        fn lookup(&self, _buffer: &[char], from: usize) -> Vec<WordMatch> {
            vec![
                WordMatch::new(from + 1, 1, WordType::noun()),
                WordMatch::new(from, 5, WordType::noun()),
                WordMatch::new(from, 1, WordType::noun()),
            ]
        }

        fn adjective_tail_freq(&self, _buffer: &[char], _word: &WordMatch) -> u32 {
            0
        }
    }

    #[test]
    fn misplaced_matches_are_dropped() {
        let buf: Vec<char> = "あいう".chars().collect();
        let lists = WordLists::build(&buf, &Misplaced);
        assert_eq!(lists.at(0).len(), 1);
        assert_eq!(lists.at(2).len(), 1);
        assert_eq!(lists.len(), 3);
    }

    #[test]
    fn decoration_sets_flags_and_class() {
        let buf: Vec<char> = "かいしゃで".chars().collect();
        let mut dict = MemoryDictionary::new();
        dict.insert(
            "かいしゃで",
            WordMatch::new(0, 4, WordType::noun().sahen()).with_dep(1, DepClass::Fuzokugo),
        );
        let lists = WordLists::build(&buf, &dict);
        let wm = &lists.at(0)[0];
        assert!(wm.mw_features.contains(MwFeatures::SV));
        assert!(!wm.mw_features.contains(MwFeatures::SEG3));
        assert_eq!(wm.seg_class, SegClass::NounDependent);
        assert_eq!(wm.dep_word_hash, dep_word_hash(&['で']));
    }

    #[test]
    fn short_and_dependent_only_flags() {
        let buf: Vec<char> = "にを".chars().collect();
        let mut num = WordMatch::new(0, 1, WordType::number(Scos::N1));
        decorate(&mut num, &buf);
        assert!(num.mw_features.contains(MwFeatures::NUM | MwFeatures::CORE1 | MwFeatures::SEG1));

        let mut dep = WordMatch::new(0, 0, WordType::NONE).with_dep(2, DepClass::Kakujoshi);
        decorate(&mut dep, &buf);
        assert!(dep.mw_features.contains(MwFeatures::DEP_ONLY | MwFeatures::SEG2));
        assert_eq!(dep.seg_class, SegClass::Bunsetsu);

        let mut pre = WordMatch::new(0, 1, WordType::noun())
            .with_prefix(1, WordType::noun().with_cos(Cos::Prefix));
        decorate(&mut pre, &buf);
        assert!(pre.mw_features.contains(MwFeatures::SUFFIX));
    }
}
