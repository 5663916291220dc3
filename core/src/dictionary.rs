//! Dictionary-side collaborators of the splitter.
//!
//! The splitter never matches readings against a dictionary itself; it
//! asks a `WordLookup` for the word matches starting at a position. This
//! module defines that trait together with the in-memory stores the
//! library ships with:
//!
//! - `MemoryDictionary` - reading -> word-match templates, persisted with
//!   bincode
//! - `ExpandPairTable` - alternative readings for substrings (e.g. a
//!   colloquial contraction and its full form)
//! - `IdiomTable` - learned segmentations ("ochaire") keyed by reading,
//!   indexed with an `fst` map over a bincode payload vector
//!
//! Keys are NFC-normalised reading strings.

use ahash::AHashMap;
use anyhow::Result;
use fst::{Map, MapBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::word::{PartKind, WordMatch};

/// Source of word matches for a buffer.
pub trait WordLookup {
    /// All matches whose span starts at `from`.
    fn lookup(&self, buffer: &[char], from: usize) -> Vec<WordMatch>;

    /// How often the core of `word` occurs as an adjective tail
    /// ("-yasui", "-nikui" ...). Zero means never.
    fn adjective_tail_freq(&self, buffer: &[char], word: &WordMatch) -> u32;
}

/// In-memory dictionary keyed by the reading of the whole match.
///
/// Each entry is a `WordMatch` template whose `from` is ignored; lookups
/// return copies positioned at the queried offset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDictionary {
    words: AHashMap<String, Vec<WordMatch>>,
    adjective_tails: AHashMap<String, u32>,
    max_key_len: usize,
}

impl MemoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a word-match template for `reading`.
    ///
    /// Returns false (and stores nothing) when the template's length does
    /// not equal the reading length.
    pub fn insert<K: AsRef<str>>(&mut self, reading: K, template: WordMatch) -> bool {
        let key = crate::utils::normalize(reading.as_ref());
        let key_len = key.chars().count();
        if key_len == 0 || template.len != key_len {
            tracing::warn!(
                reading = %key,
                template_len = template.len,
                "word template length does not match its reading"
            );
            return false;
        }
        let mut template = template;
        template.from = 0;
        self.max_key_len = self.max_key_len.max(key_len);
        self.words.entry(key).or_default().push(template);
        true
    }

    /// Record the adjective-tail frequency of a core reading.
    pub fn set_adjective_tail<K: AsRef<str>>(&mut self, reading: K, freq: u32) {
        self.adjective_tails
            .insert(crate::utils::normalize(reading.as_ref()), freq);
    }

    /// Number of distinct readings.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let dict: Self = bincode::deserialize_from(reader)?;
        Ok(dict)
    }
}

impl WordLookup for MemoryDictionary {
    fn lookup(&self, buffer: &[char], from: usize) -> Vec<WordMatch> {
        let mut out = Vec::new();
        if from >= buffer.len() {
            return out;
        }
        let last = buffer.len().min(from + self.max_key_len);
        let mut key = String::new();
        for end in from..last {
            key.push(buffer[end]);
            if let Some(templates) = self.words.get(&key) {
                out.extend(templates.iter().map(|t| {
                    let mut wm = t.clone();
                    wm.from = from;
                    wm
                }));
            }
        }
        out
    }

    fn adjective_tail_freq(&self, buffer: &[char], word: &WordMatch) -> u32 {
        let start = word.from + word.part_offset(PartKind::Core);
        let end = start + word.core().len;
        if end > buffer.len() || start == end {
            return 0;
        }
        let key: String = buffer[start..end].iter().collect();
        self.adjective_tails.get(&key).copied().unwrap_or(0)
    }
}

/// Alternative readings for substrings of the input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandPairTable {
    pairs: AHashMap<String, Vec<String>>,
}

impl ExpandPairTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reading` as an alternative for `key`.
    pub fn insert<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, reading: V) {
        let key = crate::utils::normalize(key.as_ref());
        let reading = crate::utils::normalize(reading.as_ref());
        let bucket = self.pairs.entry(key).or_default();
        if !bucket.contains(&reading) {
            bucket.push(reading);
        }
    }

    /// Readings registered for the characters in `key`.
    pub fn lookup(&self, key: &[char]) -> &[String] {
        let key: String = key.iter().collect();
        self.pairs.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }
}

/// One segment of a learned segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdiomSegment {
    /// Reading length in characters.
    pub len: usize,
    pub text: String,
}

/// A learned segmentation of a reading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdiomEntry {
    pub segments: Vec<IdiomSegment>,
}

impl IdiomEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(mut self, len: usize, text: S) -> Self {
        self.segments.push(IdiomSegment {
            len,
            text: text.into(),
        });
        self
    }

    pub fn reading_len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum()
    }
}

/// Learned segmentations: an fst map (reading -> index) and a bincode
/// vector of entries.
#[derive(Debug, Clone)]
pub struct IdiomTable {
    map: Map<Vec<u8>>,
    entries: Vec<IdiomEntry>,
}

impl Default for IdiomTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IdiomTable {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            map: Map::default(),
            entries: Vec::new(),
        }
    }

    /// Build from (reading, entry) pairs. A repeated reading keeps the last
    /// entry given for it.
    pub fn build<I, K>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, IdiomEntry)>,
        K: AsRef<str>,
    {
        let sorted: BTreeMap<String, IdiomEntry> = items
            .into_iter()
            .map(|(k, v)| (crate::utils::normalize(k.as_ref()), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();

        let mut builder = MapBuilder::memory();
        let mut entries = Vec::with_capacity(sorted.len());
        for (idx, (key, entry)) in sorted.into_iter().enumerate() {
            builder.insert(key.as_bytes(), idx as u64)?;
            entries.push(entry);
        }
        let map = Map::new(builder.into_inner()?)?;
        Ok(Self { map, entries })
    }

    /// Load from an fst + bincode pair written by `save`.
    pub fn load<P: AsRef<Path>>(fst_path: P, bincode_path: P) -> Result<Self> {
        let map = {
            let mut f = File::open(fst_path.as_ref())?;
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)?;
            Map::new(buf)?
        };
        let entries: Vec<IdiomEntry> = {
            let reader = BufReader::new(File::open(bincode_path.as_ref())?);
            bincode::deserialize_from(reader)?
        };
        if entries.len() < map.len() {
            anyhow::bail!(
                "idiom payload has {} entries but the index has {} keys",
                entries.len(),
                map.len()
            );
        }
        Ok(Self { map, entries })
    }

    pub fn save<P: AsRef<Path>>(&self, fst_path: P, bincode_path: P) -> Result<()> {
        let mut f = BufWriter::new(File::create(fst_path.as_ref())?);
        f.write_all(self.map.as_fst().as_bytes())?;
        f.flush()?;
        let w = BufWriter::new(File::create(bincode_path.as_ref())?);
        bincode::serialize_into(w, &self.entries)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup.
    pub fn get(&self, key: &[char]) -> Option<&IdiomEntry> {
        let key: String = key.iter().collect();
        let idx = self.map.get(key.as_bytes())? as usize;
        self.entries.get(idx)
    }

    /// Longest stored reading that is a prefix of `text`, with its length.
    pub fn longest_prefix(&self, text: &[char]) -> Option<(usize, &IdiomEntry)> {
        (1..=text.len())
            .rev()
            .find_map(|n| self.get(&text[..n]).map(|e| (n, e)))
    }
}
