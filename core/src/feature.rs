//! Feature lists: small sorted sets of integer feature ids.
//!
//! Every candidate transition in the lattice is described by a feature
//! list, which is then looked up in a trained table. Feature ids are
//! grouped into categories; each list has a *view* which decides which
//! categories it accepts, so narrower lists can be derived from a full one
//! by re-filtering.
//!
//! Id layout:
//! - `0..20` current segment class
//! - `30..` dependent-word class
//! - `542..=562` boolean meta-word features
//! - `570..580` noun subclass
//! - `1000..1400` class transition
//! - `2000..4048` dependent-word hash
//! - `10000..` reading hash (even) / word hash (odd)

use bitflags::bitflags;
use std::fmt;

use crate::segclass::{DepClass, SegClass, SEG_SIZE};
use crate::word::MwFeatures;
use crate::wtype::{Pos, WordType, COS_NR};

/// Maximum number of features a list can hold.
pub const NR_EM_FEATURES: usize = 14;
/// Dependent-word hashes are reduced modulo this.
pub const WORD_HASH_MAX: i32 = 2048;

pub const CUR_CLASS_BASE: i32 = 0;
pub const DEP_TYPE_FEATURE_BASE: i32 = 30;
pub const FEATURE_SV: i32 = 542;
pub const FEATURE_WEAK: i32 = 543;
pub const FEATURE_SUFFIX: i32 = 544;
pub const FEATURE_NUM: i32 = 546;
pub const FEATURE_HIGH_FREQ: i32 = 548;
pub const FEATURE_CORE1: i32 = 550;
pub const FEATURE_CORE2: i32 = 551;
pub const FEATURE_CORE3: i32 = 552;
pub const FEATURE_SEG1: i32 = 560;
pub const FEATURE_SEG2: i32 = 561;
pub const FEATURE_SEG3: i32 = 562;
pub const COS_FEATURE_BASE: i32 = 570;
pub const CLASS_TRANS_BASE: i32 = 1000;
pub const DEP_FEATURE_BASE: i32 = 2000;
pub const WORD_HASH_BASE: i32 = 10000;

bitflags! {
    /// Feature categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeatureClass: u32 {
        const MISC = 0x1;
        const SEG = 0x2;
        const TRANS = 0x4;
        const YOMI = 0x8;
        const WORD = 0x10;
        const SHORT_LEN = 0x20;
        const SEG_LEN = 0x40;
        const SEGCLASS = 0x80;
        const CORE = 0x100;
        const NOUN_COS = 0x200;
    }
}

/// Which categories a feature list accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureView {
    All,
    /// Candidate ordering
    Cand,
    /// Full segmentation view; the others below are subsets of it
    Seg,
    SegTrans,
    SegLen,
    SegStruct,
    /// Core-word structure
    CoreStruct,
}

impl FeatureView {
    pub fn accepts(self) -> FeatureClass {
        use FeatureClass as C;
        match self {
            FeatureView::All => C::all(),
            FeatureView::Cand => C::MISC | C::SEG | C::TRANS | C::SEGCLASS | C::CORE,
            FeatureView::Seg => {
                C::MISC
                    | C::SEG
                    | C::TRANS
                    | C::YOMI
                    | C::SHORT_LEN
                    | C::SEG_LEN
                    | C::SEGCLASS
                    | C::CORE
                    | C::NOUN_COS
            }
            FeatureView::SegTrans => C::MISC | C::SEG | C::TRANS | C::SHORT_LEN | C::NOUN_COS,
            FeatureView::SegLen => C::SEG_LEN,
            FeatureView::SegStruct => C::MISC | C::SEG | C::SHORT_LEN | C::SEGCLASS,
            FeatureView::CoreStruct => C::CORE,
        }
    }
}

/// Category of a feature id. Ranges are tested in a fixed order since a few
/// of them overlap numerically.
pub fn feature_class(f: i32) -> FeatureClass {
    let seg_size = SEG_SIZE as i32;
    if (DEP_FEATURE_BASE..DEP_FEATURE_BASE + WORD_HASH_MAX).contains(&f) {
        return FeatureClass::SEG;
    }
    if (FEATURE_SEG1..=FEATURE_SEG3).contains(&f) {
        return FeatureClass::SEG_LEN;
    }
    if (FEATURE_CORE1..=FEATURE_CORE2).contains(&f) {
        return FeatureClass::SHORT_LEN;
    }
    if (CUR_CLASS_BASE..CUR_CLASS_BASE + seg_size).contains(&f) {
        return FeatureClass::SEGCLASS;
    }
    if (CLASS_TRANS_BASE..CLASS_TRANS_BASE + seg_size * seg_size).contains(&f) {
        return FeatureClass::TRANS;
    }
    if (COS_FEATURE_BASE..COS_FEATURE_BASE + COS_NR).contains(&f) {
        return FeatureClass::NOUN_COS;
    }
    if f == FEATURE_WEAK {
        return FeatureClass::CORE;
    }
    if f >= WORD_HASH_BASE {
        return if f & 1 == 1 {
            FeatureClass::WORD
        } else {
            FeatureClass::YOMI
        };
    }
    FeatureClass::MISC
}

/// A bounded list of feature ids filtered through a view.
///
/// Adds beyond capacity, and adds of ids the view does not accept, are
/// silently ignored.
#[derive(Debug, Clone, Copy)]
pub struct FeatureList {
    view: FeatureView,
    nr: usize,
    index: [i32; NR_EM_FEATURES],
}

impl FeatureList {
    pub fn new(view: FeatureView) -> Self {
        Self {
            view,
            nr: 0,
            index: [0; NR_EM_FEATURES],
        }
    }

    pub fn view(&self) -> FeatureView {
        self.view
    }

    pub fn len(&self) -> usize {
        self.nr
    }

    pub fn is_empty(&self) -> bool {
        self.nr == 0
    }

    pub fn nth(&self, n: usize) -> Option<i32> {
        self.as_slice().get(n).copied()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.index[..self.nr]
    }

    pub fn add(&mut self, f: i32) {
        if !self.view.accepts().intersects(feature_class(f)) {
            return;
        }
        if self.nr < NR_EM_FEATURES {
            self.index[self.nr] = f;
            self.nr += 1;
        }
    }

    /// Copy of this list re-filtered through `view`.
    pub fn clone_as(&self, view: FeatureView) -> FeatureList {
        let mut fl = FeatureList::new(view);
        for &f in self.as_slice() {
            fl.add(f);
        }
        fl
    }

    pub fn sort(&mut self) {
        self.index[..self.nr].sort_unstable();
    }

    pub fn set_cur_class(&mut self, cc: SegClass) {
        self.add(CUR_CLASS_BASE + cc.id() as i32);
    }

    pub fn set_class_trans(&mut self, pc: SegClass, cc: SegClass) {
        self.add(CLASS_TRANS_BASE + (pc.id() * SEG_SIZE + cc.id()) as i32);
    }

    pub fn set_dep_word(&mut self, hash: i32) {
        self.add(DEP_FEATURE_BASE + hash);
    }

    pub fn set_dep_class(&mut self, dc: DepClass) {
        self.add(DEP_TYPE_FEATURE_BASE + dc.id());
    }

    /// Only prefix, postfix and sahen-suffix nouns contribute a feature.
    pub fn set_core_wtype(&mut self, wt: &WordType) {
        use crate::wtype::Cos;
        if wt.pos == Pos::Noun && matches!(wt.cos, Cos::Postfix | Cos::Prefix | Cos::SvSuffix) {
            self.add(COS_FEATURE_BASE + wt.cos.id());
        }
    }

    pub fn set_mw_features(&mut self, mask: MwFeatures) {
        const ORDER: [(MwFeatures, i32); 9] = [
            (MwFeatures::WEAK_CONN, FEATURE_WEAK),
            (MwFeatures::SUFFIX, FEATURE_SUFFIX),
            (MwFeatures::SV, FEATURE_SV),
            (MwFeatures::NUM, FEATURE_NUM),
            (MwFeatures::CORE1, FEATURE_CORE1),
            (MwFeatures::CORE2, FEATURE_CORE2),
            (MwFeatures::SEG1, FEATURE_SEG1),
            (MwFeatures::SEG2, FEATURE_SEG2),
            (MwFeatures::SEG3, FEATURE_SEG3),
        ];
        for (flag, f) in ORDER {
            if mask.contains(flag) {
                self.add(f);
            }
        }
    }

    /// Reading hash; always even.
    pub fn set_yomi_hash(&mut self, hash: i32) {
        self.add(hash.wrapping_add(WORD_HASH_BASE) & 0x3fff_fffe);
    }

    /// Word hash; always odd.
    pub fn set_word_hash(&mut self, hash: i32) {
        self.add((hash.wrapping_add(WORD_HASH_BASE) & 0x3fff_fffe) + 1);
    }

    pub fn has_yomi(&self) -> bool {
        self.as_slice().iter().any(|&f| f >= WORD_HASH_BASE)
    }
}

impl PartialEq for FeatureList {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for FeatureList {}

impl fmt::Display for FeatureList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("features=")?;
        for (i, id) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}
