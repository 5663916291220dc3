//! Per-request segmentation context.
//!
//! A `SplitterContext` owns the character buffer of one conversion request
//! together with its word lists, meta-word arena and the boundary state
//! written by the search. The statistical model is shared and read-only.
//!
//! ```no_run
//! use std::sync::Arc;
//! use libkana_core::{Config, Direction, MemoryDictionary, SplitterContext, SplitterModel};
//!
//! let model = Arc::new(SplitterModel::new());
//! let dict = MemoryDictionary::new();
//! let mut ctx = SplitterContext::new(model, &dict, "きょうはいいてんき", Direction::Forward, Config::default())?;
//! ctx.mark_all()?;
//! for seg in ctx.segments() {
//!     println!("{} {}", ctx.text(seg.from, seg.len), seg.seg_class);
//! }
//! # Ok::<(), libkana_core::SplitError>(())
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dictionary::WordLookup;
use crate::error::{Result, SplitError};
use crate::lattice::Lattice;
use crate::metaword::{MetaWord, MetaWordBuilder, MetaWordId, MetaWordStore};
use crate::model::SplitterModel;
use crate::segclass::SegClass;
use crate::wordlist::WordLists;
use crate::Config;

/// Order in which the input is processed. `Reverse` runs the same
/// algorithm over the reversed buffer, for predictive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// One committed segment, in buffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub from: usize,
    pub len: usize,
    pub seg_class: SegClass,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.from + self.len
    }
}

/// Boundary state filled in by the search. Indexed by position, with one
/// extra slot for the buffer end.
#[derive(Debug, Clone, Default)]
pub(crate) struct SplitInfo {
    pub(crate) seg_border: Vec<bool>,
    pub(crate) best_seg_class: Vec<SegClass>,
    pub(crate) best_mw: Vec<Option<MetaWordId>>,
}

impl SplitInfo {
    fn new(char_count: usize) -> Self {
        Self {
            seg_border: vec![false; char_count + 1],
            best_seg_class: vec![SegClass::Head; char_count + 1],
            best_mw: vec![None; char_count + 1],
        }
    }

    fn reset(&mut self, from: usize, to: usize) {
        for pos in from..to {
            self.seg_border[pos] = false;
            self.best_seg_class[pos] = SegClass::Head;
            self.best_mw[pos] = None;
        }
    }
}

/// Segmentation state for one buffer.
#[derive(Debug)]
pub struct SplitterContext {
    model: Arc<SplitterModel>,
    config: Config,
    direction: Direction,
    buffer: Vec<char>,
    words: WordLists,
    store: MetaWordStore,
    info: SplitInfo,
}

impl SplitterContext {
    /// Normalise `text`, look up its words and build every meta-word.
    pub fn new(
        model: Arc<SplitterModel>,
        dictionary: &dyn WordLookup,
        text: &str,
        direction: Direction,
        config: Config,
    ) -> Result<Self> {
        let mut buffer: Vec<char> = crate::utils::normalize(text).chars().collect();
        if buffer.is_empty() {
            return Err(SplitError::EmptyBuffer);
        }
        if direction == Direction::Reverse {
            buffer.reverse();
        }

        let words = WordLists::build(&buffer, dictionary);
        let mut store = MetaWordStore::new(buffer.len());
        store.set_trace_commits(config.debug_metawords);
        MetaWordBuilder::new(&mut store, &buffer, &words, dictionary, &model).build_all();

        if config.debug_metawords {
            for (id, _) in store.iter() {
                tracing::debug!("{}", store.describe(id));
            }
        }

        let info = SplitInfo::new(buffer.len());
        Ok(Self {
            model,
            config,
            direction,
            buffer,
            words,
            store,
            info,
        })
    }

    /// Segment `from..to`. A `pinned` border is kept: meta-words that would
    /// swallow it inside a single segment are not used.
    pub fn mark_border(&mut self, from: usize, pinned: Option<usize>, to: usize) -> Result<()> {
        let len = self.buffer.len();
        if from >= to || to > len {
            return Err(SplitError::InvalidRange { from, to, len });
        }
        if let Some(p) = pinned {
            if p < from || p > to {
                return Err(SplitError::InvalidPinnedBorder { pinned: p, from, to });
            }
        }

        self.info.reset(from, to);
        self.store.reset_usability(from, to);
        for pos in from..to {
            for i in 0..self.store.at(pos).len() {
                let id = self.store.at(pos)[i];
                self.store.check_usability(id, pinned);
            }
        }

        self.info.seg_border[from] = true;
        let path = {
            let mut lattice = Lattice::new(&self.store, &self.model, &self.config, from, to);
            lattice.build();
            lattice.best_path()
        };
        for step in path {
            self.info.best_seg_class[step.border] = step.seg_class;
            self.store.mark_border(step.mw, &mut self.info);
        }

        tracing::debug!(from, to, pinned = ?pinned, segments = self.segments().len(), "marked borders");
        Ok(())
    }

    /// Segment the whole buffer.
    pub fn mark_all(&mut self) -> Result<()> {
        self.mark_border(0, None, self.buffer.len())
    }

    /// Whether a segment starts at `pos`. The buffer end always counts.
    pub fn is_border(&self, pos: usize) -> bool {
        pos == self.buffer.len() || self.info.seg_border.get(pos).copied().unwrap_or(false)
    }

    /// Class chosen for the segment starting at `pos`.
    pub fn best_seg_class(&self, pos: usize) -> Option<SegClass> {
        if pos < self.buffer.len() && self.info.seg_border[pos] {
            Some(self.info.best_seg_class[pos])
        } else {
            None
        }
    }

    /// Meta-word preferred by the search for the segment at `pos`, when a
    /// compound decomposition picked one.
    pub fn best_metaword(&self, pos: usize) -> Option<MetaWordId> {
        self.info.best_mw.get(pos).copied().flatten()
    }

    /// Segments tiling the buffer, left to right.
    pub fn segments(&self) -> Vec<Segment> {
        let len = self.buffer.len();
        let mut out = Vec::new();
        let mut start = 0;
        for pos in 1..=len {
            if self.is_border(pos) {
                out.push(Segment {
                    from: start,
                    len: pos - start,
                    seg_class: self.info.best_seg_class[start],
                });
                start = pos;
            }
        }
        out
    }

    /// Number of usable meta-words covering exactly `from..from + len`.
    pub fn metaword_count(&self, from: usize, len: usize) -> usize {
        self.store.usable(from, len).count()
    }

    pub fn nth_metaword(&self, from: usize, len: usize, n: usize) -> Option<MetaWordId> {
        self.store.usable(from, len).nth(n)
    }

    pub fn metaword(&self, id: MetaWordId) -> &MetaWord {
        self.store.get(id)
    }

    pub fn metawords(&self) -> &MetaWordStore {
        &self.store
    }

    pub fn words(&self) -> &WordLists {
        &self.words
    }

    pub fn char_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn buffer(&self) -> &[char] {
        &self.buffer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Buffer text of `from..from + len`, clamped to the buffer.
    pub fn text(&self, from: usize, len: usize) -> String {
        let end = from.saturating_add(len).min(self.buffer.len());
        self.buffer[from.min(end)..end].iter().collect()
    }
}
