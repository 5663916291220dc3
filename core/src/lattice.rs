//! Lattice construction and Viterbi search over meta-words.
//!
//! `beams[p]` holds the nodes whose meta-word *ends* at position `p`
//! (the root node sits at the region start). Each node records the class
//! of its segment, where the segment starts, its own probability and the
//! probability of the best path reaching it. A beam keeps at most one
//! node per (segment class, start) pair and at most `beam_width` nodes.
//!
//! Node probabilities combine four trained tables looked up with views of
//! the same feature list:
//!
//! ```text
//! p = (trans > 0.4 ? trans : seg) * (2 + yomi) / 3 * seg_len
//! p = 1 - (1 - p) / len
//! ```

use std::cmp::Ordering;

use crate::feature::{FeatureList, FeatureView};
use crate::metaword::{MetaWord, MetaWordId, MetaWordKind, MetaWordStore, Usability};
use crate::model::SplitterModel;
use crate::segclass::SegClass;
use crate::word::MwFeatures;
use crate::Config;

/// Fallback when the transition table has no entry. A transition score has
/// to beat it to be used instead of the structure score.
pub const TRANS_FALLBACK: f64 = 0.4;
pub const SEG_FALLBACK: f64 = 0.5;
pub const YOMI_FALLBACK: f64 = 1.0;
pub const SEG_LEN_FALLBACK: f64 = 0.5;
/// Fallback of the end-of-sentence correction.
pub const TAIL_FALLBACK: f64 = 0.5;

/// Index of a node in the lattice arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeNode {
    /// Creation sequence number, for diagnostics.
    pub node_id: u32,
    /// Start of the node's segment.
    pub border: usize,
    pub seg_class: SegClass,
    pub node_probability: f64,
    pub path_probability: f64,
    pub before: Option<NodeId>,
    /// None only for the root.
    pub mw: Option<MetaWordId>,
}

/// One step of the chosen path, right to left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    pub border: usize,
    pub seg_class: SegClass,
    pub mw: MetaWordId,
}

/// Features describing a segment of class `cc` following class `pc`.
pub fn segment_features(
    view: FeatureView,
    cc: SegClass,
    pc: SegClass,
    mw: Option<&MetaWord>,
) -> FeatureList {
    let mut fl = FeatureList::new(view);
    fl.set_cur_class(cc);
    fl.set_class_trans(pc, cc);
    if let Some(mw) = mw {
        fl.set_dep_class(mw.dep_class);
        fl.set_dep_word(mw.dep_word_hash);
        fl.set_mw_features(mw.features);
        fl.set_core_wtype(&mw.core_wt);
        fl.set_yomi_hash(mw.yomi_hash);
    }
    fl.sort();
    fl
}

/// Probability that `mw` is a correct segment when it follows a segment
/// of class `before`.
pub fn transition_probability(model: &SplitterModel, before: SegClass, mw: &MetaWord) -> f64 {
    let seg = segment_features(FeatureView::Seg, mw.seg_class, before, Some(mw));
    let trans = seg.clone_as(FeatureView::SegTrans);
    let structure = seg.clone_as(FeatureView::SegStruct);
    let length = seg.clone_as(FeatureView::SegLen);

    let trans_p = model.trans_info.probability(&trans, TRANS_FALLBACK);
    let seg_p = model.seg_info.probability(&structure, SEG_FALLBACK);
    let all_p = model.yomi_info.probability(&seg, YOMI_FALLBACK);
    let len_p = model.seg_len_info.probability(&length, SEG_LEN_FALLBACK);

    let mut p = if trans_p > TRANS_FALLBACK { trans_p } else { seg_p };
    p *= (2.0 + all_p) / 3.0;
    p *= len_p;

    tracing::trace!(
        trans = %trans,
        seg = %structure,
        all = %seg,
        len = %length,
        trans_p,
        seg_p,
        all_p,
        len_p,
        "transition"
    );

    // longer segments are penalised less
    1.0 - (1.0 - p) / mw.len.max(1) as f64
}

/// Search lattice for the region `from..to` of one buffer.
pub struct Lattice<'a> {
    store: &'a MetaWordStore,
    model: &'a SplitterModel,
    beam_width: usize,
    trace_nodes: bool,
    trace_path: bool,
    from: usize,
    to: usize,
    nodes: Vec<LatticeNode>,
    free: Vec<NodeId>,
    beams: Vec<Vec<NodeId>>,
    last_node_id: u32,
}

impl<'a> Lattice<'a> {
    pub fn new(
        store: &'a MetaWordStore,
        model: &'a SplitterModel,
        config: &Config,
        from: usize,
        to: usize,
    ) -> Self {
        Self {
            store,
            model,
            beam_width: config.beam_width.max(1),
            trace_nodes: config.debug_lattice_nodes,
            trace_path: config.debug_lattice_path,
            from,
            to,
            nodes: Vec::new(),
            free: Vec::new(),
            beams: vec![Vec::new(); to + 1],
            last_node_id: 0,
        }
    }

    /// Build the lattice and apply the end-of-sentence correction.
    pub fn build(&mut self) {
        let root = self.alloc_node(LatticeNode {
            node_id: 0,
            border: self.from,
            seg_class: SegClass::Head,
            node_probability: 1.0,
            path_probability: 1.0,
            before: None,
            mw: None,
        });
        self.push_node(self.from, root);

        let store = self.store;
        for i in self.from..self.to {
            let lefts = self.beams[i].clone();
            for left in lefts {
                for &mw_id in store.at(i) {
                    let mw = store.get(mw_id);
                    if mw.can_use != Usability::Usable || mw.len == 0 || i + mw.len > self.to {
                        continue;
                    }
                    let node = self.extend(left, mw_id, i);
                    self.push_node(i + mw.len, node);
                }
            }
        }

        for id in self.beams[self.to].clone() {
            let pc = self.nodes[id.index()].seg_class;
            let fl = segment_features(FeatureView::SegTrans, SegClass::Tail, pc, None);
            let p = self.model.trans_info.probability(&fl, TAIL_FALLBACK);
            self.nodes[id.index()].path_probability *= p;
            if self.trace_nodes {
                tracing::trace!(node = self.nodes[id.index()].node_id, tail = %fl, p, "end correction");
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &LatticeNode {
        &self.nodes[id.index()]
    }

    /// Live nodes ending at `pos`.
    pub fn beam(&self, pos: usize) -> impl Iterator<Item = (NodeId, &LatticeNode)> + '_ {
        self.beams
            .get(pos)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&id| (id, &self.nodes[id.index()]))
    }

    pub fn node_count(&self) -> usize {
        self.beams.iter().map(|b| b.len()).sum()
    }

    /// Best path ending at the region end, or at the nearest earlier
    /// position some path reached. Steps are returned right to left and
    /// exclude the root.
    pub fn best_path(&self) -> Vec<PathStep> {
        let mut last = self.to;
        while last > self.from && self.beams[last].is_empty() {
            last -= 1;
        }
        let mut best: Option<NodeId> = None;
        for &id in &self.beams[last] {
            if best.map_or(true, |b| self.cmp_nodes(id, b) == Ordering::Greater) {
                best = Some(id);
            }
        }

        let mut steps = Vec::new();
        let mut cur = best;
        while let Some(id) = cur {
            let node = &self.nodes[id.index()];
            if node.before.is_none() {
                break;
            }
            if let Some(mw) = node.mw {
                steps.push(PathStep {
                    border: node.border,
                    seg_class: node.seg_class,
                    mw,
                });
                if self.trace_path {
                    tracing::debug!(
                        node = node.node_id,
                        border = node.border,
                        seg_class = %node.seg_class,
                        node_p = node.node_probability,
                        path_p = node.path_probability,
                        "{}",
                        self.store.describe(mw)
                    );
                }
            }
            cur = node.before;
        }
        steps
    }

    /// Total order used for collapsing, eviction and the final choice.
    ///
    /// Walking back both paths while their meta-words end at the same
    /// position, a learned-idiom node beats any other and a compound head
    /// beats a compound part. Otherwise the higher path probability wins.
    pub fn cmp_nodes(&self, lhs: NodeId, rhs: NodeId) -> Ordering {
        let (mut l, mut r) = (Some(lhs), Some(rhs));
        while let (Some(a), Some(b)) = (l, r) {
            let (na, nb) = (&self.nodes[a.index()], &self.nodes[b.index()]);
            let (Some(ma), Some(mb)) = (na.mw, nb.mw) else {
                break;
            };
            let (ma, mb) = (self.store.get(ma), self.store.get(mb));
            if ma.end() != mb.end() {
                break;
            }
            let idiom = ma
                .kind
                .is_learned_idiom()
                .cmp(&mb.kind.is_learned_idiom());
            if idiom != Ordering::Equal {
                return idiom;
            }
            match (ma.kind, mb.kind) {
                (MetaWordKind::CompoundHead { .. }, MetaWordKind::CompoundPart) => {
                    return Ordering::Greater
                }
                (MetaWordKind::CompoundPart, MetaWordKind::CompoundHead { .. }) => {
                    return Ordering::Less
                }
                _ => {}
            }
            l = na.before;
            r = nb.before;
        }
        let (pa, pb) = (
            self.nodes[lhs.index()].path_probability,
            self.nodes[rhs.index()].path_probability,
        );
        pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
    }

    fn alloc_node(&mut self, mut node: LatticeNode) -> NodeId {
        self.last_node_id += 1;
        node.node_id = self.last_node_id;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() as u32 - 1)
            }
        }
    }

    fn extend(&mut self, before: NodeId, mw_id: MetaWordId, border: usize) -> NodeId {
        let mw = self.store.get(mw_id);
        let prev = &self.nodes[before.index()];
        let node_probability = if mw.features.contains(MwFeatures::OCHAIRE) {
            1.0
        } else {
            transition_probability(self.model, prev.seg_class, mw)
        };
        let path_probability = prev.path_probability * node_probability;
        self.alloc_node(LatticeNode {
            node_id: 0,
            border,
            seg_class: mw.seg_class,
            node_probability,
            path_probability,
            before: Some(before),
            mw: Some(mw_id),
        })
    }

    fn push_node(&mut self, position: usize, new: NodeId) {
        if self.trace_nodes {
            let n = &self.nodes[new.index()];
            tracing::trace!(
                node = n.node_id,
                before = n.before.map(|b| self.nodes[b.index()].node_id),
                border = n.border,
                position,
                seg_class = %n.seg_class,
                node_p = n.node_probability,
                path_p = n.path_probability,
                "lattice node"
            );
        }

        let (class, border) = {
            let n = &self.nodes[new.index()];
            (n.seg_class, n.border)
        };
        let slot = self.beams[position].iter().position(|&id| {
            let n = &self.nodes[id.index()];
            n.seg_class == class && n.border == border
        });
        if let Some(slot) = slot {
            let old = self.beams[position][slot];
            if self.cmp_nodes(new, old) != Ordering::Less {
                self.beams[position][slot] = new;
                self.free.push(old);
            } else {
                self.free.push(new);
            }
            return;
        }

        self.beams[position].push(new);
        if self.beams[position].len() > self.beam_width {
            self.remove_min(position);
        }
    }

    // first-found minimum goes
    fn remove_min(&mut self, position: usize) {
        let beam = &self.beams[position];
        let mut min = 0;
        for idx in 1..beam.len() {
            if self.cmp_nodes(beam[idx], beam[min]) == Ordering::Less {
                min = idx;
            }
        }
        let id = self.beams[position].remove(min);
        self.free.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{CLASS_TRANS_BASE, CUR_CLASS_BASE};
    use crate::segclass::SEG_SIZE;
    use crate::table::FeatureTableBuilder;

    fn synthetic(l: &mut Lattice<'_>, border: usize, class: SegClass, p: f64) -> NodeId {
        l.alloc_node(LatticeNode {
            node_id: 0,
            border,
            seg_class: class,
            node_probability: p,
            path_probability: p,
            before: None,
            mw: None,
        })
    }

    #[test]
    fn beam_keeps_the_best_fifty() {
        let store = MetaWordStore::default();
        let model = SplitterModel::new();
        let config = Config::default();
        let mut l = Lattice::new(&store, &model, &config, 0, 60);
        for border in 0..51 {
            let p = if border == 17 { 0.001 } else { 0.5 + border as f64 / 1000.0 };
            let id = synthetic(&mut l, border, SegClass::Noun, p);
            l.push_node(60, id);
        }
        assert_eq!(l.beam(60).count(), 50);
        assert!(l.beam(60).all(|(_, n)| n.border != 17), "worst node evicted");
    }

    #[test]
    fn collapse_keeps_better_or_equal_newcomer() {
        let store = MetaWordStore::default();
        let model = SplitterModel::new();
        let config = Config::default();
        let mut l = Lattice::new(&store, &model, &config, 0, 4);

        let a = synthetic(&mut l, 1, SegClass::Noun, 0.3);
        l.push_node(4, a);
        let b = synthetic(&mut l, 1, SegClass::Noun, 0.2);
        l.push_node(4, b);
        let kept: Vec<NodeId> = l.beam(4).map(|(id, _)| id).collect();
        assert_eq!(kept, vec![a]);

        let c = synthetic(&mut l, 1, SegClass::Noun, 0.3);
        l.push_node(4, c);
        let kept: Vec<NodeId> = l.beam(4).map(|(id, _)| id).collect();
        assert_eq!(kept, vec![c]);

        // different class at the same border is a separate node
        let d = synthetic(&mut l, 1, SegClass::Bunsetsu, 0.1);
        l.push_node(4, d);
        assert_eq!(l.beam(4).count(), 2);
    }

    #[test]
    fn fallback_constants_without_tables() {
        let model = SplitterModel::new();
        let mw = MetaWord {
            from: 0,
            len: 1,
            kind: MetaWordKind::Single,
            seg_class: SegClass::Noun,
            dep_class: crate::segclass::DepClass::Raw,
            dep_word_hash: 0,
            core_wt: crate::wtype::WordType::noun(),
            features: MwFeatures::empty(),
            yomi_hash: 42,
            word: None,
            can_use: Usability::Usable,
            hint: None,
            parent: None,
        };
        // seg 0.5 * (2 + 1.0) / 3 * len 0.5
        let p = transition_probability(&model, SegClass::Head, &mw);
        assert!((p - 0.25).abs() < 1e-12);
        let long = MetaWord { len: 2, ..mw.clone() };
        assert!((transition_probability(&model, SegClass::Head, &long) - 0.625).abs() < 1e-12);
    }

    #[test]
    fn transition_table_only_counts_above_fallback() {
        let mw = MetaWord {
            from: 0,
            len: 1,
            kind: MetaWordKind::Single,
            seg_class: SegClass::Noun,
            dep_class: crate::segclass::DepClass::Raw,
            dep_word_hash: 0,
            core_wt: crate::wtype::WordType::noun(),
            features: MwFeatures::empty(),
            yomi_hash: 0,
            word: None,
            can_use: Usability::Usable,
            hint: None,
            parent: None,
        };
        let trans_key = segment_features(FeatureView::Seg, SegClass::Noun, SegClass::Head, Some(&mw))
            .clone_as(FeatureView::SegTrans);
        let head_noun = CLASS_TRANS_BASE + (SegClass::Head.id() * SEG_SIZE + SegClass::Noun.id()) as i32;
        assert!(trans_key.as_slice().contains(&head_noun));
        assert!(!trans_key
            .as_slice()
            .contains(&(CUR_CLASS_BASE + SegClass::Noun.id() as i32)));

        let mut b = FeatureTableBuilder::new();
        b.add_list(&trans_key, 1, 9);
        let model = SplitterModel {
            trans_info: b.build(),
            ..SplitterModel::new()
        };
        // 0.9 * (2 + 1) / 3 * 0.5
        let p = transition_probability(&model, SegClass::Head, &mw);
        assert!((p - 0.45).abs() < 1e-12);

        let mut b = FeatureTableBuilder::new();
        b.add_list(&trans_key, 7, 3);
        let model = SplitterModel {
            trans_info: b.build(),
            ..SplitterModel::new()
        };
        // 0.3 does not beat the fallback, the structure score is used
        let p = transition_probability(&model, SegClass::Head, &mw);
        assert!((p - 0.25).abs() < 1e-12);
    }
}
