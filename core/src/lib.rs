//! libkana-core
//!
//! Segmentation and candidate-lattice engine for Japanese kana-to-kanji
//! conversion. A phonetic buffer is split into bunsetsu: dictionary matches
//! become meta-words (simple words, compound decompositions, fused verb and
//! numeral groups, learned idioms), meta-words become lattice edges scored
//! with trained feature tables, and a beam-limited Viterbi search commits
//! segment boundaries.
//!
//! Public API:
//! - `SplitterContext` - per-request buffer, meta-words and boundaries
//! - `SplitterModel` - shared read-only feature tables and idiom data
//! - `WordLookup` / `MemoryDictionary` - dictionary collaborator
//! - `FeatureList` / `FeatureTable` - feature encoding and table lookup
//! - `Config` - beam width and debug switches
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Result, SplitError};

pub mod wtype;
pub use wtype::{ConjType, Cos, Pos, Scos, WordType};

pub mod xchar;
pub use xchar::{char_type, XCharType};

pub mod word;
pub use word::{CompoundEntry, MwFeatures, PartKind, WordMatch, WordPart};

pub mod segclass;
pub use segclass::{classify, DepClass, SegClass};

pub mod feature;
pub use feature::{FeatureList, FeatureView};

pub mod table;
pub use table::{FeatureFreq, FeatureTable, FeatureTableBuilder};

pub mod dictionary;
pub use dictionary::{ExpandPairTable, IdiomEntry, IdiomTable, MemoryDictionary, WordLookup};

pub mod model;
pub use model::SplitterModel;

pub mod wordlist;
pub use wordlist::{WordLists, WordRef};

pub mod metaword;
pub use metaword::{MetaWord, MetaWordId, MetaWordKind, MetaWordStore, Usability, VerbComboKind};

pub mod lattice;
pub use lattice::{Lattice, LatticeNode, NodeId, PathStep};

pub mod splitter;
pub use splitter::{Direction, Segment, SplitterContext};

/// Segmentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of lattice nodes kept per position
    pub beam_width: usize,
    /// Dump every committed meta-word
    pub debug_metawords: bool,
    /// Trace lattice nodes and their scores
    pub debug_lattice_nodes: bool,
    /// Log the chosen path
    pub debug_lattice_path: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beam_width: 50,
            debug_metawords: false,
            debug_lattice_nodes: false,
            debug_lattice_path: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}
