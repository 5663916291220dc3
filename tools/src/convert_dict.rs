use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use libkana_core::{
    CompoundEntry, ConjType, Cos, DepClass, ExpandPairTable, IdiomEntry, IdiomTable,
    MemoryDictionary, Pos, Scos, WordMatch, WordType,
};

/// Dictionary record as written in the JSON source file.
#[derive(Debug, Clone, Deserialize)]
pub struct DictRecord {
    pub reading: String,
    #[serde(default)]
    pub prefix: usize,
    pub core: usize,
    pub pos: Pos,
    #[serde(default)]
    pub cos: Cos,
    #[serde(default)]
    pub scos: Scos,
    #[serde(default)]
    pub ct: ConjType,
    #[serde(default)]
    pub sahen: bool,
    #[serde(default)]
    pub verb_suffix: bool,
    #[serde(default)]
    pub dep: usize,
    #[serde(default)]
    pub dep_class: Option<DepClass>,
    #[serde(default)]
    pub postfix: usize,
    #[serde(default)]
    pub tail_ct: Option<ConjType>,
    #[serde(default)]
    pub weak: bool,
    /// Compound decompositions, each a list of (reading length, text).
    #[serde(default)]
    pub compounds: Vec<Vec<(usize, String)>>,
    /// Adjective-tail frequency of the core reading.
    #[serde(default)]
    pub adjective_tail: u32,
}

impl DictRecord {
    pub fn to_word(&self) -> WordMatch {
        let mut wt = WordType::new(self.pos)
            .with_cos(self.cos)
            .with_scos(self.scos)
            .with_ct(self.ct);
        wt.sv = self.sahen;
        wt.vsuffix = self.verb_suffix;

        let mut wm = WordMatch::new(0, self.core, wt);
        if self.prefix > 0 {
            wm = wm.with_prefix(self.prefix, WordType::new(Pos::Pre));
        }
        if self.dep > 0 {
            wm = wm.with_dep(self.dep, self.dep_class.unwrap_or(DepClass::Fuzokugo));
        }
        if self.postfix > 0 {
            wm = wm.with_postfix(self.postfix, WordType::new(Pos::Suc));
        }
        if let Some(ct) = self.tail_ct {
            wm = wm.with_tail_ct(ct);
        }
        if self.weak {
            wm = wm.weak_connection();
        }
        for segments in &self.compounds {
            let entry = segments
                .iter()
                .fold(CompoundEntry::new(), |e, (len, text)| e.push(*len, text.as_str()));
            wm = wm.with_compound(entry);
        }
        wm
    }
}

/// Build a `MemoryDictionary` from a JSON array of records. Records whose
/// part lengths disagree with their reading are skipped.
pub fn build_dictionary(input: &Path) -> Result<MemoryDictionary> {
    let reader = BufReader::new(File::open(input).with_context(|| input.display().to_string())?);
    let records: Vec<DictRecord> = serde_json::from_reader(reader)?;
    let mut dict = MemoryDictionary::new();
    let mut skipped = 0usize;
    for rec in &records {
        if !dict.insert(&rec.reading, rec.to_word()) {
            skipped += 1;
            continue;
        }
        if rec.adjective_tail > 0 {
            let core: String = rec
                .reading
                .chars()
                .skip(rec.prefix)
                .take(rec.core)
                .collect();
            dict.set_adjective_tail(core, rec.adjective_tail);
        }
    }
    tracing::info!(records = records.len(), skipped, readings = dict.len(), "built dictionary");
    Ok(dict)
}

/// Parse `reading<TAB>len:text len:text ...`.
pub fn parse_idiom_line(line: &str) -> Result<Option<(String, IdiomEntry)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let Some((reading, rest)) = line.split_once('\t') else {
        bail!("expected `reading<TAB>segments`, got {:?}", line);
    };
    let mut entry = IdiomEntry::new();
    for seg in rest.split_whitespace() {
        let Some((len, text)) = seg.split_once(':') else {
            bail!("bad idiom segment {:?}", seg);
        };
        entry = entry.push(len.parse::<usize>()?, text);
    }
    if entry.reading_len() != reading.chars().count() {
        bail!("segments of {:?} do not cover the reading", reading);
    }
    Ok(Some((reading.to_string(), entry)))
}

pub fn build_idioms(input: &Path) -> Result<IdiomTable> {
    let reader = BufReader::new(File::open(input).with_context(|| input.display().to_string())?);
    let mut items = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        match parse_idiom_line(&line?) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => tracing::warn!(line = lineno + 1, error = %e, "skipping idiom line"),
        }
    }
    IdiomTable::build(items)
}

/// Parse `key<TAB>reading` lines into an expand-pair table.
pub fn build_expand_pairs(input: &Path) -> Result<ExpandPairTable> {
    let reader = BufReader::new(File::open(input).with_context(|| input.display().to_string())?);
    let mut table = ExpandPairTable::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            Some((key, reading)) => table.insert(key.trim(), reading.trim()),
            None => tracing::warn!(line, "expand pair without a reading"),
        }
    }
    Ok(table)
}
