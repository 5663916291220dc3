/*!
FeatureTable: read-only probability tables keyed by feature lists.

A table is a flat blob of big-endian `i32` words:

- a 16-word header; word 0 is the total weight, word 1 the number of lines
- `lines` records of 16 words each: 14 feature ids (zero padded), the
  negative count and the positive count

Records are sorted ascending by their 14 feature words (signed compare),
so lookup is a binary search over the blob without decoding it. Tables
are produced offline; `FeatureTableBuilder` writes the same format for
tools and tests.
*/

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, SplitError};
use crate::feature::{FeatureList, NR_EM_FEATURES};

const WORDS_PER_LINE: usize = NR_EM_FEATURES + 2;
const LINE_BYTES: usize = WORDS_PER_LINE * 4;
const HEADER_WORDS: usize = 16;
const HEADER_BYTES: usize = HEADER_WORDS * 4;

/// One decoded table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFreq {
    pub features: [i32; NR_EM_FEATURES],
    pub negative: i32,
    pub positive: i32,
}

impl FeatureFreq {
    /// `1 - neg / (pos + neg)`, or None when the counts carry no signal.
    pub fn probability(&self) -> Option<f64> {
        let pos = self.positive as f64;
        let neg = self.negative as f64;
        let total = pos + neg;
        if total == 0.0 {
            return None;
        }
        let p = 1.0 - neg / total;
        if p < 0.0 {
            None
        } else {
            Some(p)
        }
    }
}

/// Sorted feature-frequency table over an owned big-endian blob.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    bytes: Vec<u8>,
    nr_lines: usize,
}

impl FeatureTable {
    /// A table with no records. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a blob, checking that the header and all announced lines are
    /// present.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::empty());
        }
        if bytes.len() < HEADER_BYTES {
            return Err(SplitError::InvalidTable(format!(
                "header needs {} bytes, blob has {}",
                HEADER_BYTES,
                bytes.len()
            )));
        }
        let nr = read_word(&bytes, 1);
        if nr < 0 {
            return Err(SplitError::InvalidTable(format!("negative line count {}", nr)));
        }
        let nr_lines = nr as usize;
        let need = HEADER_BYTES + nr_lines * LINE_BYTES;
        if bytes.len() < need {
            return Err(SplitError::InvalidTable(format!(
                "{} lines need {} bytes, blob has {}",
                nr_lines,
                need,
                bytes.len()
            )));
        }
        Ok(Self { bytes, nr_lines })
    }

    /// Read a table blob from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let table = Self::from_bytes(buf)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), lines = table.nr_lines, "loaded feature table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.nr_lines
    }

    pub fn is_empty(&self) -> bool {
        self.nr_lines == 0
    }

    /// Total weight stored in the header.
    pub fn total_weight(&self) -> i32 {
        if self.bytes.is_empty() {
            0
        } else {
            read_word(&self.bytes, 0)
        }
    }

    /// Look up a feature list. The list is padded with zeros to 14 entries.
    pub fn find(&self, fl: &FeatureList) -> Option<FeatureFreq> {
        self.find_array(fl.as_slice())
    }

    /// Look up raw feature ids. At most 14 are used.
    pub fn find_array(&self, features: &[i32]) -> Option<FeatureFreq> {
        let mut key = [0i32; NR_EM_FEATURES];
        for (slot, &f) in key.iter_mut().zip(features) {
            *slot = f;
        }

        let mut lo = 0usize;
        let mut hi = self.nr_lines;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.compare_line(mid, &key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(self.line(mid)),
            }
        }
        None
    }

    /// Probability for `fl`, or `fallback` when the list is absent or its
    /// counts are unusable.
    pub fn probability(&self, fl: &FeatureList, fallback: f64) -> f64 {
        self.find(fl)
            .and_then(|freq| freq.probability())
            .unwrap_or(fallback)
    }

    fn line_word(&self, line: usize, word: usize) -> i32 {
        read_word(&self.bytes, HEADER_WORDS + line * WORDS_PER_LINE + word)
    }

    // ordering of the stored line relative to `key`
    fn compare_line(&self, line: usize, key: &[i32; NR_EM_FEATURES]) -> Ordering {
        for (i, k) in key.iter().enumerate() {
            let stored = self.line_word(line, i);
            match stored.cmp(k) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn line(&self, line: usize) -> FeatureFreq {
        let mut features = [0i32; NR_EM_FEATURES];
        for (i, f) in features.iter_mut().enumerate() {
            *f = self.line_word(line, i);
        }
        FeatureFreq {
            features,
            negative: self.line_word(line, NR_EM_FEATURES),
            positive: self.line_word(line, NR_EM_FEATURES + 1),
        }
    }
}

fn read_word(bytes: &[u8], word: usize) -> i32 {
    let off = word * 4;
    i32::from_be_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}

/// Accumulates (features, negative, positive) records and writes them in
/// the blob format `FeatureTable` reads.
#[derive(Debug, Clone, Default)]
pub struct FeatureTableBuilder {
    lines: Vec<FeatureFreq>,
}

impl FeatureTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add counts for a feature combination. Repeated combinations are
    /// summed. Features beyond the 14th are dropped.
    pub fn add(&mut self, features: &[i32], negative: i32, positive: i32) {
        let mut key = [0i32; NR_EM_FEATURES];
        for (slot, &f) in key.iter_mut().zip(features) {
            *slot = f;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.features == key) {
            line.negative += negative;
            line.positive += positive;
            return;
        }
        self.lines.push(FeatureFreq {
            features: key,
            negative,
            positive,
        });
    }

    pub fn add_list(&mut self, fl: &FeatureList, negative: i32, positive: i32) {
        self.add(fl.as_slice(), negative, positive);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serialize into the big-endian blob format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut lines = self.lines.clone();
        lines.sort_by(|a, b| a.features.cmp(&b.features));

        let total: i64 = lines
            .iter()
            .map(|l| l.negative as i64 + l.positive as i64)
            .sum();
        let mut out = Vec::with_capacity(HEADER_BYTES + lines.len() * LINE_BYTES);
        let mut header = [0i32; HEADER_WORDS];
        header[0] = total.clamp(0, i32::MAX as i64) as i32;
        header[1] = lines.len() as i32;
        for w in header {
            out.extend_from_slice(&w.to_be_bytes());
        }
        for line in &lines {
            for f in line.features {
                out.extend_from_slice(&f.to_be_bytes());
            }
            out.extend_from_slice(&line.negative.to_be_bytes());
            out.extend_from_slice(&line.positive.to_be_bytes());
        }
        out
    }

    pub fn build(&self) -> FeatureTable {
        let bytes = self.to_bytes();
        let nr_lines = self.lines.len();
        FeatureTable { bytes, nr_lines }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&self.to_bytes())?;
        w.flush()?;
        Ok(())
    }
}
