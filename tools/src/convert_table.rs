use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use libkana_core::FeatureTableBuilder;

/// Parse one line of a text feature table:
/// `<feature,feature,...> <negative> <positive>`.
///
/// Features come back sorted. Blank lines and `#` comments yield None.
pub fn parse_line(line: &str) -> Result<Option<(Vec<i32>, i32, i32)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parts: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    };
    if parts.len() != 3 {
        bail!("expected `features negative positive`, got {:?}", line);
    }
    let mut features = parts[0]
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("bad feature list {:?}", parts[0]))?;
    // lookups key on sorted lists
    features.sort_unstable();
    let negative = parts[1].trim().parse::<i32>()?;
    let positive = parts[2].trim().parse::<i32>()?;
    Ok(Some((features, negative, positive)))
}

/// Compile a text table into the binary blob read by `FeatureTable`.
/// Returns the number of distinct lines written.
pub fn run(input: &Path, out: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(input).with_context(|| input.display().to_string())?);
    let mut builder = FeatureTableBuilder::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some((features, neg, pos))) => builder.add(&features, neg, pos),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "skipping table line");
            }
        }
    }
    builder.save(out)?;
    Ok(builder.len())
}
