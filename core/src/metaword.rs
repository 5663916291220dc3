//! Meta-words: candidate segment units.
//!
//! A meta-word covers a span of the buffer and is either backed by a single
//! word match or built from other meta-words (compound decompositions,
//! verb-continuative fusions, numeral chains, symbol wraps, learned
//! idioms). All meta-words of a request live in one arena, the
//! `MetaWordStore`, addressed by `MetaWordId`; composite variants refer to
//! their children by id.
//!
//! Every meta-word has at most one parent. Attaching a child that already
//! has a parent attaches a deep copy instead, so a tree can be walked and
//! mutated without affecting any other tree.
//!
//! Construction runs five passes over the buffer:
//! 1. one meta-word per word match (compound matches expand into trees)
//! 2. right-to-left combination of adjacent meta-words
//! 3. dummy meta-words for expand-pair readings
//! 4. wraps absorbing trailing symbol runs, and fillers for empty positions
//! 5. learned-idiom segments

use ahash::AHashSet;
use std::fmt::Write as _;

use crate::dictionary::{IdiomEntry, WordLookup};
use crate::model::SplitterModel;
use crate::segclass::{DepClass, SegClass};
use crate::splitter::SplitInfo;
use crate::word::{reading_hash, CompoundEntry, MwFeatures, PartKind, WordMatch};
use crate::wordlist::{WordLists, WordRef};
use crate::wtype::{ConjType, Pos, Scos, WordType};
use crate::xchar::{char_type, XCharType};

/// Index of a meta-word in its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaWordId(u32);

impl MetaWordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which verb-continuative fusion a `VerbCombo` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerbComboKind {
    /// verb + adjective-forming suffix ("yomi-yasui")
    Adjective,
    /// verb + verb-forming suffix ("yomi-naosu")
    Verb,
    /// verb + postfix noun ("yomi-kata")
    Noun,
}

/// Variant of a meta-word. Child slots exist only where they are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaWordKind {
    Dummy,
    Single,
    Wrap {
        inner: MetaWordId,
    },
    CompoundHead {
        leaf: MetaWordId,
        rest: Option<MetaWordId>,
    },
    Compound {
        leaf: MetaWordId,
        rest: Option<MetaWordId>,
    },
    CompoundLeaf,
    CompoundPart,
    VerbCombo {
        kind: VerbComboKind,
        left: MetaWordId,
        right: Option<MetaWordId>,
    },
    Number {
        head: MetaWordId,
        tail: Option<MetaWordId>,
    },
    LearnedIdiom {
        next: Option<MetaWordId>,
    },
}

impl MetaWordKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetaWordKind::Dummy => "dummy",
            MetaWordKind::Single => "single",
            MetaWordKind::Wrap { .. } => "wrap",
            MetaWordKind::CompoundHead { .. } => "compound_head",
            MetaWordKind::Compound { .. } => "compound",
            MetaWordKind::CompoundLeaf => "compound_leaf",
            MetaWordKind::CompoundPart => "compound_part",
            MetaWordKind::VerbCombo {
                kind: VerbComboKind::Adjective,
                ..
            } => "v_renyou_a",
            MetaWordKind::VerbCombo {
                kind: VerbComboKind::Verb,
                ..
            } => "v_renyou_v",
            MetaWordKind::VerbCombo {
                kind: VerbComboKind::Noun,
                ..
            } => "v_renyou_noun",
            MetaWordKind::Number { .. } => "number",
            MetaWordKind::LearnedIdiom { .. } => "ochaire",
        }
    }

    /// Child ids in order (left to right).
    pub fn children(&self) -> impl Iterator<Item = MetaWordId> {
        let slots = match *self {
            MetaWordKind::Wrap { inner } => [Some(inner), None],
            MetaWordKind::CompoundHead { leaf, rest } | MetaWordKind::Compound { leaf, rest } => {
                [Some(leaf), rest]
            }
            MetaWordKind::VerbCombo { left, right, .. } => [Some(left), right],
            MetaWordKind::Number { head, tail } => [Some(head), tail],
            MetaWordKind::LearnedIdiom { next } => [next, None],
            _ => [None, None],
        };
        slots.into_iter().flatten()
    }

    fn map_children(self, mut f: impl FnMut(MetaWordId) -> MetaWordId) -> MetaWordKind {
        match self {
            MetaWordKind::Wrap { inner } => MetaWordKind::Wrap { inner: f(inner) },
            MetaWordKind::CompoundHead { leaf, rest } => MetaWordKind::CompoundHead {
                leaf: f(leaf),
                rest: rest.map(&mut f),
            },
            MetaWordKind::Compound { leaf, rest } => MetaWordKind::Compound {
                leaf: f(leaf),
                rest: rest.map(&mut f),
            },
            MetaWordKind::VerbCombo { kind, left, right } => MetaWordKind::VerbCombo {
                kind,
                left: f(left),
                right: right.map(&mut f),
            },
            MetaWordKind::Number { head, tail } => MetaWordKind::Number {
                head: f(head),
                tail: tail.map(&mut f),
            },
            MetaWordKind::LearnedIdiom { next } => MetaWordKind::LearnedIdiom { next: next.map(&mut f) },
            other => other,
        }
    }

    pub fn is_learned_idiom(&self) -> bool {
        matches!(self, MetaWordKind::LearnedIdiom { .. })
    }
}

/// Whether a meta-word may take part in the current search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usability {
    Unchecked,
    Usable,
    Blocked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaWord {
    pub from: usize,
    pub len: usize,
    pub kind: MetaWordKind,
    pub seg_class: SegClass,
    pub dep_class: DepClass,
    pub dep_word_hash: i32,
    /// Word type of the core word; `WordType::NONE` when there is none.
    pub core_wt: WordType,
    pub features: MwFeatures,
    /// Hash of the covered reading, set on commit.
    pub yomi_hash: i32,
    /// Backing word match, for word-backed meta-words only.
    pub word: Option<WordRef>,
    pub can_use: Usability,
    /// Surface text suggested to the candidate layer.
    pub hint: Option<String>,
    pub parent: Option<MetaWordId>,
}

impl MetaWord {
    fn new(from: usize, len: usize, kind: MetaWordKind) -> Self {
        Self {
            from,
            len,
            kind,
            seg_class: SegClass::Head,
            dep_class: DepClass::None,
            dep_word_hash: 0,
            core_wt: WordType::NONE,
            features: MwFeatures::empty(),
            yomi_hash: 0,
            word: None,
            can_use: Usability::Usable,
            hint: None,
            parent: None,
        }
    }

    /// One past the last covered position.
    pub fn end(&self) -> usize {
        self.from + self.len
    }
}

/// Arena of meta-words plus the per-position lists of committed ones.
#[derive(Debug, Clone, Default)]
pub struct MetaWordStore {
    words: Vec<MetaWord>,
    by_pos: Vec<Vec<MetaWordId>>,
    trace_commits: bool,
}

impl MetaWordStore {
    pub(crate) fn new(char_count: usize) -> Self {
        Self {
            words: Vec::new(),
            by_pos: vec![Vec::new(); char_count],
            trace_commits: false,
        }
    }

    pub(crate) fn set_trace_commits(&mut self, on: bool) {
        self.trace_commits = on;
    }

    pub fn get(&self, id: MetaWordId) -> &MetaWord {
        &self.words[id.index()]
    }

    fn get_mut(&mut self, id: MetaWordId) -> &mut MetaWord {
        &mut self.words[id.index()]
    }

    /// Committed meta-words starting at `pos`, in commit order.
    pub fn at(&self, pos: usize) -> &[MetaWordId] {
        self.by_pos.get(pos).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Total number of meta-words in the arena, committed or not.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn committed_count(&self) -> usize {
        self.by_pos.iter().map(|v| v.len()).sum()
    }

    /// Every arena entry with its id.
    pub fn iter(&self) -> impl Iterator<Item = (MetaWordId, &MetaWord)> {
        self.words
            .iter()
            .enumerate()
            .map(|(i, mw)| (MetaWordId(i as u32), mw))
    }

    /// Usable committed meta-words covering exactly `from..from + len`.
    pub fn usable(&self, from: usize, len: usize) -> impl Iterator<Item = MetaWordId> + '_ {
        self.at(from).iter().copied().filter(move |&id| {
            let mw = self.get(id);
            mw.len == len && mw.can_use == Usability::Usable
        })
    }

    fn alloc(&mut self, mw: MetaWord) -> MetaWordId {
        let id = MetaWordId(self.words.len() as u32);
        self.words.push(mw);
        id
    }

    fn commit(&mut self, id: MetaWordId, buffer: &[char]) {
        let (from, end) = {
            let mw = self.get(id);
            (mw.from, mw.end())
        };
        self.get_mut(id).yomi_hash = reading_hash(&buffer[from..end]);
        self.by_pos[from].push(id);
        if self.trace_commits {
            tracing::trace!("{}", self.describe(id));
        }
    }

    /// Make `child` a child of `parent`, copying it first if it is already
    /// owned by another parent. Returns the id actually attached.
    fn attach(&mut self, child: MetaWordId, parent: MetaWordId) -> MetaWordId {
        let child = if self.get(child).parent.is_some() {
            self.deep_clone(child)
        } else {
            child
        };
        self.get_mut(child).parent = Some(parent);
        child
    }

    fn deep_clone(&mut self, id: MetaWordId) -> MetaWordId {
        let mut copy = self.get(id).clone();
        copy.parent = None;
        let kind = copy.kind;
        let new_id = self.alloc(copy);
        let kind = kind.map_children(|c| {
            let c = self.deep_clone(c);
            self.get_mut(c).parent = Some(new_id);
            c
        });
        self.get_mut(new_id).kind = kind;
        new_id
    }

    // Allocate a parent spanning `left` and `right`. Segment class and
    // dependent hash come from the rightmost child. Kind is filled in by
    // the caller.
    fn alloc_joined(&mut self, left: MetaWordId, right: Option<MetaWordId>) -> MetaWordId {
        let l = self.get(left);
        let (from, mut len, mut seg_class, mut dep_word_hash) =
            (l.from, l.len, l.seg_class, l.dep_word_hash);
        if let Some(r) = right {
            let r = self.get(r);
            len += r.len;
            seg_class = r.seg_class;
            dep_word_hash = r.dep_word_hash;
        }
        let mut mw = MetaWord::new(from, len, MetaWordKind::Dummy);
        mw.seg_class = seg_class;
        mw.dep_word_hash = dep_word_hash;
        self.alloc(mw)
    }

    fn cons(
        &mut self,
        left: MetaWordId,
        right: Option<MetaWordId>,
        make: impl FnOnce(MetaWordId, Option<MetaWordId>) -> MetaWordKind,
    ) -> MetaWordId {
        let id = self.alloc_joined(left, right);
        let left = self.attach(left, id);
        let right = right.map(|r| self.attach(r, id));
        self.get_mut(id).kind = make(left, right);
        id
    }

    /// Reset usability of every meta-word (and its subtree) starting in
    /// `from..to`.
    pub(crate) fn reset_usability(&mut self, from: usize, to: usize) {
        for pos in from..to.min(self.by_pos.len()) {
            for i in 0..self.by_pos[pos].len() {
                let id = self.by_pos[pos][i];
                self.reset_tree(id);
            }
        }
    }

    fn reset_tree(&mut self, id: MetaWordId) {
        self.get_mut(id).can_use = Usability::Unchecked;
        let kind = self.get(id).kind;
        for c in kind.children() {
            self.reset_tree(c);
        }
    }

    /// Decide usability of `id` for a search pinned at `border`.
    ///
    /// A meta-word is blocked when `border` falls strictly inside a span
    /// it would commit as a single segment. Composites are usable when all
    /// their children are.
    pub(crate) fn check_usability(&mut self, id: MetaWordId, border: Option<usize>) -> Usability {
        let mw = self.get(id);
        if mw.can_use != Usability::Unchecked {
            return mw.can_use;
        }
        let (from, end, kind) = (mw.from, mw.end(), mw.kind);
        let inside = |b: usize| b > from && b < end;

        let state = match border {
            None => Usability::Usable,
            Some(b) => match kind {
                MetaWordKind::Dummy
                | MetaWordKind::Single
                | MetaWordKind::CompoundLeaf
                | MetaWordKind::CompoundPart
                | MetaWordKind::VerbCombo { .. } => {
                    if inside(b) {
                        Usability::Blocked
                    } else {
                        Usability::Usable
                    }
                }
                MetaWordKind::Wrap { inner } => {
                    let inner_end = self.get(inner).end();
                    // the absorbed run is glued to the inner's last segment
                    if inside(b) && b >= inner_end {
                        Usability::Blocked
                    } else {
                        self.check_usability(inner, border)
                    }
                }
                MetaWordKind::LearnedIdiom { next } => {
                    if inside(b) {
                        Usability::Blocked
                    } else {
                        match next {
                            Some(n) => self.check_usability(n, border),
                            None => Usability::Usable,
                        }
                    }
                }
                MetaWordKind::CompoundHead { .. }
                | MetaWordKind::Compound { .. }
                | MetaWordKind::Number { .. } => {
                    let mut state = Usability::Usable;
                    for c in kind.children() {
                        if self.check_usability(c, border) == Usability::Blocked {
                            state = Usability::Blocked;
                        }
                    }
                    state
                }
            },
        };
        self.get_mut(id).can_use = state;
        state
    }

    /// Commit the segment boundaries implied by choosing `id`.
    pub(crate) fn mark_border(&mut self, id: MetaWordId, info: &mut SplitInfo) {
        let (from, kind) = {
            let mw = self.get(id);
            (mw.from, mw.kind)
        };
        match kind {
            MetaWordKind::Dummy
            | MetaWordKind::Single
            | MetaWordKind::CompoundPart
            | MetaWordKind::VerbCombo { .. } => {
                info.seg_border[from] = true;
            }
            MetaWordKind::CompoundLeaf => {
                info.seg_border[from] = true;
                info.best_mw[from] = Some(id);
                self.get_mut(id).can_use = Usability::Usable;
            }
            MetaWordKind::CompoundHead { leaf: first, rest: second }
            | MetaWordKind::Compound { leaf: first, rest: second }
            | MetaWordKind::Number { head: first, tail: second } => {
                let first_from = self.get(first).from;
                info.best_mw[first_from] = Some(first);
                self.mark_border(first, info);
                if let Some(second) = second {
                    self.mark_border(second, info);
                }
            }
            MetaWordKind::Wrap { inner } => self.mark_border(inner, info),
            MetaWordKind::LearnedIdiom { next } => {
                info.seg_border[from] = true;
                if let Some(next) = next {
                    self.mark_border(next, info);
                }
            }
        }
    }

    /// Multi-line dump of a meta-word tree.
    pub fn describe(&self, id: MetaWordId) -> String {
        let mut out = String::new();
        self.describe_into(id, 0, &mut out);
        out
    }

    fn describe_into(&self, id: MetaWordId, indent: usize, out: &mut String) {
        let mw = self.get(id);
        let _ = write!(
            out,
            "{:indent$}*meta word type={}({}-{}):seg_class={}",
            "",
            mw.kind.name(),
            mw.from,
            mw.len,
            mw.seg_class.name(),
            indent = indent
        );
        for (name, _) in mw.features.iter_names() {
            let _ = write!(out, ":{}", name.to_ascii_lowercase());
        }
        let _ = writeln!(out, ":can_use={:?}*", mw.can_use);
        if let Some(hint) = &mw.hint {
            let _ = writeln!(out, "{:indent$}({})", "", hint, indent = indent);
        }
        for c in mw.kind.children() {
            self.describe_into(c, indent + 1, out);
        }
    }
}

/// Whether a numeral of scale `right` may follow one of scale `left`
/// ("sen" + "man" yes, "juu" + "hyaku" no).
pub fn number_scales_combine(left: Scos, right: Scos) -> bool {
    if right == Scos::None {
        return false;
    }
    match left {
        Scos::N1 => !matches!(right, Scos::N1 | Scos::N10 | Scos::N100 | Scos::N1000),
        Scos::N10 => !matches!(right, Scos::N10 | Scos::N100 | Scos::N1000),
        Scos::N100 => !matches!(right, Scos::N100 | Scos::N1000),
        Scos::N1000 => right != Scos::N1000,
        Scos::N10000 => true,
        _ => false,
    }
}

// start, length and display text of one compound segment
struct LeafSpan {
    from: usize,
    len: usize,
    hint: String,
}

/// Runs the construction passes over one buffer.
pub(crate) struct MetaWordBuilder<'a> {
    store: &'a mut MetaWordStore,
    buffer: &'a [char],
    words: &'a WordLists,
    lookup: &'a dyn WordLookup,
    model: &'a SplitterModel,
    combined: AHashSet<MetaWordId>,
}

impl<'a> MetaWordBuilder<'a> {
    pub(crate) fn new(
        store: &'a mut MetaWordStore,
        buffer: &'a [char],
        words: &'a WordLists,
        lookup: &'a dyn WordLookup,
        model: &'a SplitterModel,
    ) -> Self {
        Self {
            store,
            buffer,
            words,
            lookup,
            model,
            combined: AHashSet::new(),
        }
    }

    pub(crate) fn build_all(mut self) {
        self.from_word_lists();
        self.combine_all();
        self.expand_pairs();
        self.wrap_dependent_chars();
        self.learned_idioms();
        tracing::debug!(
            chars = self.buffer.len(),
            committed = self.store.committed_count(),
            total = self.store.len(),
            "built meta-words"
        );
    }

    fn commit(&mut self, id: MetaWordId) {
        self.store.commit(id, self.buffer);
    }

    fn from_word_lists(&mut self) {
        let words = self.words;
        for pos in 0..self.buffer.len() {
            for r in words.refs_at(pos) {
                let wm = words.get(r);
                if wm.is_compound() {
                    for entry in &wm.compounds {
                        if let Some(spans) = self.compound_layout(wm, entry) {
                            self.compound_parts(wm, &spans);
                            self.compound_tree(wm, &spans);
                        }
                    }
                } else {
                    self.simple(r, wm);
                }
            }
        }
    }

    fn simple(&mut self, r: WordRef, wm: &WordMatch) {
        let mut mw = MetaWord::new(wm.from, wm.len, MetaWordKind::Single);
        mw.word = Some(r);
        mw.dep_class = wm.part(PartKind::DepWord).dc;
        mw.seg_class = wm.seg_class;
        if wm.core().len > 0 {
            mw.core_wt = wm.core().wt;
        }
        mw.dep_word_hash = wm.dep_word_hash;
        mw.features = wm.mw_features;
        let id = self.store.alloc(mw);
        self.commit(id);
    }

    // Prefix text goes to the first segment, dependent and postfix text to
    // the last.
    fn compound_layout(&self, wm: &WordMatch, entry: &CompoundEntry) -> Option<Vec<LeafSpan>> {
        let pre = wm.part(PartKind::Prefix).len;
        let post = wm.part(PartKind::DepWord).len + wm.part(PartKind::Postfix).len;
        let n = entry.segments.len();
        if n == 0
            || entry.segments.iter().any(|s| s.len == 0)
            || pre + entry.reading_len() + post != wm.len
        {
            tracing::warn!(
                from = wm.from,
                len = wm.len,
                segments = n,
                reading_len = entry.reading_len(),
                "compound segments do not tile the word, skipped"
            );
            return None;
        }
        let pre_text: String = self.buffer[wm.from..wm.from + pre].iter().collect();
        let post_text: String = self.buffer[wm.from + wm.len - post..wm.from + wm.len]
            .iter()
            .collect();

        let mut spans = Vec::with_capacity(n);
        let mut from = wm.from;
        for (i, seg) in entry.segments.iter().enumerate() {
            let mut len = seg.len;
            let mut hint = String::new();
            if i == 0 {
                len += pre;
                hint.push_str(&pre_text);
            }
            hint.push_str(&seg.text);
            if i == n - 1 {
                len += post;
                hint.push_str(&post_text);
            }
            spans.push(LeafSpan { from, len, hint });
            from += len;
        }
        Some(spans)
    }

    fn compound_tree(&mut self, wm: &WordMatch, spans: &[LeafSpan]) {
        let mut rest: Option<MetaWordId> = None;
        for (j, span) in spans.iter().enumerate().rev() {
            let mut leaf = MetaWord::new(span.from, span.len, MetaWordKind::CompoundLeaf);
            leaf.seg_class = wm.seg_class;
            leaf.hint = Some(span.hint.clone());
            let leaf = self.store.alloc(leaf);
            self.commit(leaf);

            let node = if j == 0 {
                self.store
                    .cons(leaf, rest, |leaf, rest| MetaWordKind::CompoundHead { leaf, rest })
            } else {
                self.store
                    .cons(leaf, rest, |leaf, rest| MetaWordKind::Compound { leaf, rest })
            };
            self.commit(node);
            rest = Some(node);
        }
    }

    // every run of two or more consecutive segments
    fn compound_parts(&mut self, wm: &WordMatch, spans: &[LeafSpan]) {
        for end in (0..spans.len()).rev() {
            let mut len = spans[end].len;
            let mut hint = spans[end].hint.clone();
            for start in (0..end).rev() {
                let s = &spans[start];
                len += s.len;
                hint.insert_str(0, &s.hint);
                let mut mw = MetaWord::new(s.from, len, MetaWordKind::CompoundPart);
                mw.seg_class = wm.seg_class;
                mw.hint = Some(hint.clone());
                let id = self.store.alloc(mw);
                self.commit(id);
            }
        }
    }

    fn combine_all(&mut self) {
        for pos in (0..self.buffer.len()).rev() {
            let ids = self.store.at(pos).to_vec();
            for id in ids {
                self.combine(id);
            }
        }
    }

    // try every meta-word ending where `right` starts as a left operand
    fn combine(&mut self, right: MetaWordId) {
        if !self.combined.insert(right) {
            return;
        }
        let mw = self.store.get(right);
        if mw.features.contains(MwFeatures::DEP_ONLY) {
            return;
        }
        let from = mw.from;
        for pos in (0..from).rev() {
            let lefts = self.store.at(pos).to_vec();
            for left in lefts {
                if self.store.get(left).end() == from {
                    self.try_combine(left, right);
                }
            }
        }
    }

    fn try_combine(&mut self, left: MetaWordId, right: MetaWordId) {
        let words = self.words;
        let Some(lref) = self.store.get(left).word else {
            return;
        };
        let rref = self.store.get(right).word;
        if let Some(rref) = rref {
            if words.get(rref).part(PartKind::Prefix).len > 0 {
                return;
            }
            self.try_verb_combos(left, right, words.get(lref), words.get(rref));
        }
        self.try_number(left, right, words.get(lref));
    }

    fn try_verb_combos(&mut self, left: MetaWordId, right: MetaWordId, lw: &WordMatch, rw: &WordMatch) {
        if lw.head_pos != Pos::V || lw.tail_ct != ConjType::Renyou {
            return;
        }
        let rcore = rw.core().wt;
        if rcore.pos == Pos::Noun && rcore.cos == crate::wtype::Cos::Postfix {
            self.list_verb_combo(VerbComboKind::Noun, left, right);
        }
        if rcore.pos == Pos::D2ky && self.lookup.adjective_tail_freq(self.buffer, rw) > 0 {
            self.list_verb_combo(VerbComboKind::Adjective, left, right);
        }
        if rcore.vsuffix {
            self.list_verb_combo(VerbComboKind::Verb, left, right);
        }
    }

    fn list_verb_combo(&mut self, kind: VerbComboKind, left: MetaWordId, right: MetaWordId) {
        self.list_metaword(left, right, move |left, right| MetaWordKind::VerbCombo {
            kind,
            left,
            right,
        });
    }

    // `right` is first wrapped alone in a node of the same kind; both the
    // wrapper and the joined node are committed.
    fn list_metaword(
        &mut self,
        left: MetaWordId,
        right: MetaWordId,
        make: impl Fn(MetaWordId, Option<MetaWordId>) -> MetaWordKind + Copy,
    ) -> MetaWordId {
        let features = self.store.get(left).features | self.store.get(right).features;
        let wrapper = self.store.cons(right, None, make);
        self.commit(wrapper);
        let id = self.store.cons(left, Some(wrapper), make);
        self.store.get_mut(id).features = features;
        self.commit(id);
        id
    }

    fn try_number(&mut self, left: MetaWordId, right: MetaWordId, wl1: &WordMatch) {
        let words = self.words;
        if wl1.core().wt.pos != Pos::Number {
            return;
        }
        let r = self.store.get(right);
        let (wl2, recursive) = match r.word {
            Some(rref) => {
                let w = words.get(rref);
                if w.core().wt.pos != Pos::Number {
                    return;
                }
                (w, false)
            }
            None => match r.kind {
                MetaWordKind::Number { head, .. } => match self.store.get(head).word {
                    Some(h) => (words.get(h), true),
                    None => return,
                },
                _ => return,
            },
        };
        if wl1.part(PartKind::Postfix).len != 0 || wl1.part(PartKind::DepWord).len != 0 {
            return;
        }
        if !number_scales_combine(wl1.core().wt.scos, wl2.core().wt.scos) {
            return;
        }

        let make = |head: MetaWordId, tail: Option<MetaWordId>| MetaWordKind::Number { head, tail };
        let combined = if recursive {
            // a nested chain keeps empty features; only list fusions union them
            let id = self.store.cons(left, Some(right), make);
            self.commit(id);
            id
        } else {
            self.list_metaword(left, right, make)
        };
        self.combine(combined);
    }

    fn expand_pairs(&mut self) {
        let model = self.model;
        let Some(pairs) = model.expand_pairs.as_ref() else {
            return;
        };
        let n = self.buffer.len();
        for i in 0..n {
            for j in 1..(n - i) {
                for reading in pairs.lookup(&self.buffer[i..i + j]) {
                    let r: Vec<char> = reading.chars().collect();
                    if r.is_empty() || r.len() > n - i {
                        continue;
                    }
                    if self.buffer[i..i + r.len()] == r[..] {
                        let id = self.store.alloc(MetaWord::new(i, r.len(), MetaWordKind::Dummy));
                        self.commit(id);
                    }
                }
            }
        }
    }

    fn wrap_dependent_chars(&mut self) {
        for pos in 0..self.buffer.len() {
            let ids = self.store.at(pos).to_vec();
            for &id in &ids {
                self.wrap_following(Some(id));
            }
            if ids.is_empty() {
                let mut filler = MetaWord::new(pos, 1, MetaWordKind::Single);
                filler.seg_class = SegClass::Bunsetsu;
                let id = self.store.alloc(filler);
                self.commit(id);
            }
        }
        // a symbol run at the very start of the buffer
        self.wrap_following(None);
    }

    fn wrap_following(&mut self, mw: Option<MetaWordId>) {
        let n = self.buffer.len();
        let (from, len, inner_class) = match mw {
            Some(id) => {
                let m = self.store.get(id);
                (m.from, m.len, m.seg_class)
            }
            None => (0, 0, SegClass::Bunsetsu),
        };
        let next = from + len;
        if next >= n {
            return;
        }
        let ty = char_type(self.buffer[next]);
        if !ty.intersects(XCharType::SYMBOL | XCharType::PART) || ty.contains(XCharType::PUNCTUATION) {
            return;
        }

        let mut j = 0;
        let mut destroy = false;
        while next + j < n {
            let p = next + j;
            if char_type(self.buffer[p]) != ty {
                break;
            }
            if p + 1 >= n || self.buffer[p] != self.buffer[p + 1] {
                destroy = true;
            }
            j += 1;
        }
        if j == 0 {
            return;
        }

        let id = match mw {
            Some(inner) => {
                let id = self
                    .store
                    .cons(inner, None, |inner, _| MetaWordKind::Wrap { inner });
                let w = self.store.get_mut(id);
                w.len = len + j;
                w.dep_word_hash = 0;
                w.seg_class = if destroy {
                    SegClass::Bunsetsu
                } else {
                    inner_class
                };
                id
            }
            None => {
                let mut single = MetaWord::new(0, j, MetaWordKind::Single);
                single.seg_class = SegClass::Bunsetsu;
                self.store.alloc(single)
            }
        };
        self.commit(id);
    }

    fn learned_idioms(&mut self) {
        let model = self.model;
        let n = self.buffer.len();
        if let Some(full) = model.full_idioms.as_ref() {
            if let Some((key_len, entry)) = full.longest_prefix(self.buffer) {
                if key_len == n {
                    self.idiom_segments(0, key_len, entry);
                    if key_len > 1 {
                        return;
                    }
                }
            }
        }

        let Some(idioms) = model.idioms.as_ref() else {
            return;
        };
        let mut pos = 0;
        while pos < n {
            match idioms.longest_prefix(&self.buffer[pos..]) {
                Some((key_len, entry)) => {
                    self.idiom_segments(pos, key_len, entry);
                    pos += key_len;
                }
                None => pos += 1,
            }
        }
    }

    // segments are built right to left so each can link to its neighbour
    fn idiom_segments(&mut self, from: usize, key_len: usize, entry: &IdiomEntry) {
        if entry.segments.is_empty()
            || entry.segments.iter().any(|s| s.len == 0)
            || entry.reading_len() != key_len
        {
            tracing::warn!(
                from,
                key_len,
                reading_len = entry.reading_len(),
                "learned idiom segments do not tile the key, skipped"
            );
            return;
        }
        let mut starts = Vec::with_capacity(entry.segments.len());
        let mut off = from;
        for seg in &entry.segments {
            starts.push(off);
            off += seg.len;
        }

        let mut next: Option<MetaWordId> = None;
        for (seg, &start) in entry.segments.iter().zip(&starts).rev() {
            let mut mw = MetaWord::new(start, seg.len, MetaWordKind::LearnedIdiom { next: None });
            mw.features = MwFeatures::OCHAIRE;
            mw.hint = Some(seg.text.clone());
            let id = self.store.alloc(mw);
            if let Some(nx) = next {
                let nx = self.store.attach(nx, id);
                self.store.get_mut(id).kind = MetaWordKind::LearnedIdiom { next: Some(nx) };
            }
            self.commit(id);
            next = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{ExpandPairTable, IdiomTable, MemoryDictionary};
    use crate::segclass::DepClass;
    use crate::wtype::Cos;

    fn build(text: &str, dict: &MemoryDictionary, model: &SplitterModel) -> (Vec<char>, WordLists, MetaWordStore) {
        let buf: Vec<char> = text.chars().collect();
        let words = WordLists::build(&buf, dict);
        let mut store = MetaWordStore::new(buf.len());
        MetaWordBuilder::new(&mut store, &buf, &words, dict, model).build_all();
        (buf, words, store)
    }

    fn kinds_at(store: &MetaWordStore, pos: usize) -> Vec<(&'static str, usize)> {
        store
            .at(pos)
            .iter()
            .map(|&id| (store.get(id).kind.name(), store.get(id).len))
            .collect()
    }

    #[test]
    fn empty_positions_get_fillers() {
        let dict = MemoryDictionary::new();
        let (_, _, store) = build("あいう", &dict, &SplitterModel::new());
        for pos in 0..3 {
            assert_eq!(kinds_at(&store, pos), vec![("single", 1)]);
            assert_eq!(store.get(store.at(pos)[0]).seg_class, SegClass::Bunsetsu);
        }
    }

    #[test]
    fn compound_tree_and_parts() {
        let mut dict = MemoryDictionary::new();
        let compound = WordMatch::new(0, 4, WordType::noun())
            .with_dep(1, DepClass::Kakujoshi)
            .with_compound(CompoundEntry::new().push(2, "東京").push(2, "都"));
        dict.insert("とうきとが", compound);
        let (_, _, store) = build("とうきとが", &dict, &SplitterModel::new());

        let at0 = kinds_at(&store, 0);
        assert!(at0.contains(&("compound_part", 5)));
        assert!(at0.contains(&("compound_leaf", 2)));
        assert!(at0.contains(&("compound_head", 5)));
        let at2 = kinds_at(&store, 2);
        assert!(at2.contains(&("compound_leaf", 3)));
        assert!(at2.contains(&("compound", 3)));

        let part = store
            .at(0)
            .iter()
            .map(|&id| store.get(id))
            .find(|m| m.kind == MetaWordKind::CompoundPart)
            .unwrap();
        assert_eq!(part.hint.as_deref(), Some("東京都が"));
        assert_eq!(part.seg_class, SegClass::NounCaseParticle);
    }

    #[test]
    fn compound_length_mismatch_is_skipped() {
        let mut dict = MemoryDictionary::new();
        let bad = WordMatch::new(0, 3, WordType::noun())
            .with_compound(CompoundEntry::new().push(1, "a").push(1, "b"));
        dict.insert("あいう", bad);
        let (_, _, store) = build("あいう", &dict, &SplitterModel::new());
        assert!(store.iter().all(|(_, m)| !matches!(
            m.kind,
            MetaWordKind::CompoundLeaf | MetaWordKind::CompoundHead { .. } | MetaWordKind::CompoundPart
        )));
    }

    fn number_dict() -> MemoryDictionary {
        let mut dict = MemoryDictionary::new();
        dict.insert("いち", WordMatch::new(0, 2, WordType::number(Scos::N1)));
        dict.insert("まん", WordMatch::new(0, 2, WordType::number(Scos::N10000)));
        dict.insert("せん", WordMatch::new(0, 2, WordType::number(Scos::N1000)));
        dict
    }

    #[test]
    fn numerals_chain_and_respect_the_ladder() {
        let dict = number_dict();
        let (_, _, store) = build("せんまん", &dict, &SplitterModel::new());
        let number = store
            .at(0)
            .iter()
            .copied()
            .find(|&id| matches!(store.get(id).kind, MetaWordKind::Number { .. }))
            .expect("sen + man combines");
        let mw = store.get(number);
        assert_eq!(mw.len, 4);
        assert!(mw.features.contains(MwFeatures::NUM));
        // one-child wrapper around まん, committed with no features
        let wrapper = store
            .at(2)
            .iter()
            .map(|&id| store.get(id))
            .find(|m| matches!(m.kind, MetaWordKind::Number { tail: None, .. }))
            .expect("wrapper at 2");
        assert_eq!(wrapper.len, 2);
        assert!(wrapper.features.is_empty());

        let (_, _, store) = build("いちいち", &dict, &SplitterModel::new());
        assert!(store
            .iter()
            .all(|(_, m)| !matches!(m.kind, MetaWordKind::Number { .. })));

        // three numerals chain recursively: せん + (いち + まん)
        let (_, _, store) = build("せんいちまん", &dict, &SplitterModel::new());
        let longest = store
            .at(0)
            .iter()
            .map(|&id| store.get(id))
            .filter(|m| matches!(m.kind, MetaWordKind::Number { .. }))
            .map(|m| m.len)
            .max();
        assert_eq!(longest, Some(6));
    }

    #[test]
    fn scale_ladder() {
        assert!(!number_scales_combine(Scos::N1, Scos::N1));
        assert!(!number_scales_combine(Scos::N1, Scos::N1000));
        assert!(number_scales_combine(Scos::N1, Scos::N10000));
        assert!(!number_scales_combine(Scos::N10, Scos::N100));
        assert!(number_scales_combine(Scos::N100, Scos::N10));
        assert!(number_scales_combine(Scos::N1000, Scos::N100));
        assert!(number_scales_combine(Scos::N10000, Scos::N10000));
        assert!(!number_scales_combine(Scos::N10000, Scos::None));
        assert!(!number_scales_combine(Scos::Other, Scos::N1));
    }

    #[test]
    fn verb_continuative_fusions() {
        let mut dict = MemoryDictionary::new();
        dict.insert("よみ", WordMatch::new(0, 2, WordType::verb(ConjType::Renyou)));
        dict.insert("かた", WordMatch::new(0, 2, WordType::noun().with_cos(Cos::Postfix)));
        dict.insert(
            "やすい",
            WordMatch::new(0, 2, WordType::new(Pos::D2ky)).with_dep(1, DepClass::End),
        );
        dict.set_adjective_tail("やす", 3);

        let (_, _, store) = build("よみかた", &dict, &SplitterModel::new());
        assert!(kinds_at(&store, 0).contains(&("v_renyou_noun", 4)));

        let (_, _, store) = build("よみやすい", &dict, &SplitterModel::new());
        assert!(kinds_at(&store, 0).contains(&("v_renyou_a", 5)));
        // the right operand is also committed alone, wrapped in its own fusion node
        assert!(kinds_at(&store, 2).contains(&("v_renyou_a", 3)));
    }

    #[test]
    fn verb_suffix_fusion() {
        let mut dict = MemoryDictionary::new();
        dict.insert("よみ", WordMatch::new(0, 2, WordType::verb(ConjType::Renyou)));
        dict.insert(
            "なおす",
            WordMatch::new(0, 3, WordType::verb(ConjType::Syuusi).verb_suffix()),
        );
        let (_, _, store) = build("よみなおす", &dict, &SplitterModel::new());

        let combo = store
            .at(0)
            .iter()
            .copied()
            .find(|&id| {
                matches!(
                    store.get(id).kind,
                    MetaWordKind::VerbCombo {
                        kind: VerbComboKind::Verb,
                        ..
                    }
                )
            })
            .expect("yomi + naosu fuses");
        let mw = store.get(combo);
        assert_eq!((mw.from, mw.len), (0, 5));
        let MetaWordKind::VerbCombo {
            left,
            right: Some(wrapper),
            ..
        } = mw.kind
        else {
            panic!("fusion has a wrapped right operand");
        };
        assert_eq!(store.get(left).len, 2);
        let wrapped = store.get(wrapper);
        assert_eq!((wrapped.from, wrapped.len), (2, 3));
        assert!(wrapped.features.is_empty());
        assert!(matches!(
            wrapped.kind,
            MetaWordKind::VerbCombo {
                kind: VerbComboKind::Verb,
                right: None,
                ..
            }
        ));
        assert!(store.at(2).contains(&wrapper));

        // a verb not in continuative form does not fuse
        let mut dict = MemoryDictionary::new();
        dict.insert("よむ", WordMatch::new(0, 2, WordType::verb(ConjType::Syuusi)));
        dict.insert(
            "なおす",
            WordMatch::new(0, 3, WordType::verb(ConjType::Syuusi).verb_suffix()),
        );
        let (_, _, store) = build("よむなおす", &dict, &SplitterModel::new());
        assert!(store
            .iter()
            .all(|(_, m)| !matches!(m.kind, MetaWordKind::VerbCombo { .. })));
    }

    #[test]
    fn dependent_only_never_combines_as_right_operand() {
        let mut dict = MemoryDictionary::new();
        dict.insert("いち", WordMatch::new(0, 2, WordType::number(Scos::N1)));
        let mut dep = WordMatch::new(0, 0, WordType::number(Scos::N10000));
        dep = dep.with_dep(2, DepClass::Fuzokugo);
        dict.insert("まん", dep);
        let (_, _, store) = build("いちまん", &dict, &SplitterModel::new());
        assert!(store
            .iter()
            .all(|(_, m)| !matches!(m.kind, MetaWordKind::Number { .. })));
    }

    #[test]
    fn trailing_symbols_are_wrapped() {
        let mut dict = MemoryDictionary::new();
        dict.insert("ねこ", WordMatch::new(0, 2, WordType::noun()));
        let (_, _, store) = build("ねこ・・", &dict, &SplitterModel::new());
        let wrap = store
            .at(0)
            .iter()
            .map(|&id| store.get(id))
            .find(|m| matches!(m.kind, MetaWordKind::Wrap { .. }))
            .expect("wrap");
        assert_eq!(wrap.len, 4);
        // the last absorbed character is the end of the buffer
        assert_eq!(wrap.seg_class, SegClass::Bunsetsu);

        let (_, _, store) = build("・・ねこ", &dict, &SplitterModel::new());
        assert!(kinds_at(&store, 0).contains(&("single", 2)));

        // punctuation is never absorbed
        let (_, _, store) = build("ねこ。", &dict, &SplitterModel::new());
        assert!(kinds_at(&store, 0).iter().all(|(k, _)| *k != "wrap"));
    }

    #[test]
    fn expand_pairs_add_dummies() {
        let dict = MemoryDictionary::new();
        let mut pairs = ExpandPairTable::new();
        pairs.insert("ち", "ちゃ");
        let model = SplitterModel::new().with_expand_pairs(pairs);
        let (_, _, store) = build("ちゃん", &dict, &model);
        assert!(kinds_at(&store, 0).contains(&("dummy", 2)));
    }

    #[test]
    fn learned_idioms_link_segments() {
        let dict = MemoryDictionary::new();
        let idioms = IdiomTable::build(vec![(
            "かれはいった",
            IdiomEntry::new().push(3, "彼は").push(3, "行った"),
        )])
        .unwrap();
        let model = SplitterModel::new().with_idioms(idioms);
        let (_, _, store) = build("かれはいった", &dict, &model);
        let head = store
            .at(0)
            .iter()
            .copied()
            .find(|&id| store.get(id).kind.is_learned_idiom())
            .expect("idiom head");
        let mw = store.get(head);
        assert_eq!(mw.len, 3);
        assert!(mw.features.contains(MwFeatures::OCHAIRE));
        let MetaWordKind::LearnedIdiom { next: Some(next) } = mw.kind else {
            panic!("head links to its neighbour");
        };
        assert_eq!(store.get(next).from, 3);
        assert_eq!(store.get(next).hint.as_deref(), Some("行った"));
    }

    #[test]
    fn whole_buffer_idiom_stops_partial_matching() {
        let dict = MemoryDictionary::new();
        let full = IdiomTable::build(vec![(
            "ねこが",
            IdiomEntry::new().push(2, "猫").push(1, "が"),
        )])
        .unwrap();
        let partial = IdiomTable::build(vec![("ねこ", IdiomEntry::new().push(2, "寝子"))]).unwrap();
        let model = SplitterModel::new()
            .with_full_idioms(full)
            .with_idioms(partial);
        let (_, _, store) = build("ねこが", &dict, &model);
        let hints: Vec<_> = store
            .iter()
            .filter(|(_, m)| m.kind.is_learned_idiom())
            .filter_map(|(_, m)| m.hint.clone())
            .collect();
        assert_eq!(hints.len(), 2);
        assert!(hints.contains(&"猫".to_string()));
        assert!(!hints.contains(&"寝子".to_string()));
    }

    #[test]
    fn every_child_has_exactly_one_parent() {
        let dict = number_dict();
        let (_, _, store) = build("せんいちまん・・", &dict, &SplitterModel::new());
        let mut seen = AHashSet::new();
        for (id, mw) in store.iter() {
            for c in mw.kind.children() {
                assert!(seen.insert(c), "child {:?} appears twice", c);
                assert_eq!(store.get(c).parent, Some(id));
            }
        }
    }
}
