// core/src/model.rs
//
// Read-only statistical model shared by all splitter contexts.

use std::path::Path;
use std::sync::Arc;

use crate::dictionary::{ExpandPairTable, IdiomTable};
use crate::table::FeatureTable;

/// File names looked up by `SplitterModel::load_dir`.
pub const TRANS_TABLE_FILE: &str = "trans_info.tbl";
pub const SEG_TABLE_FILE: &str = "seg_info.tbl";
pub const YOMI_TABLE_FILE: &str = "yomi_info.tbl";
pub const SEG_LEN_TABLE_FILE: &str = "seg_len_info.tbl";
pub const EXPAND_PAIRS_FILE: &str = "expand_pairs.bincode";
pub const IDIOMS_FST_FILE: &str = "idioms.fst";
pub const IDIOMS_BINCODE_FILE: &str = "idioms.bincode";
pub const FULL_IDIOMS_FST_FILE: &str = "full_idioms.fst";
pub const FULL_IDIOMS_BINCODE_FILE: &str = "full_idioms.bincode";

/// The four feature tables used for segmentation scoring plus the
/// optional expand-pair and learned-idiom tables.
///
/// A model is immutable once built; share it between contexts with
/// `Arc<SplitterModel>`.
#[derive(Debug, Clone, Default)]
pub struct SplitterModel {
    /// Class-transition table
    pub trans_info: FeatureTable,
    /// Segment-structure table
    pub seg_info: FeatureTable,
    /// Full segmentation view including the reading hash
    pub yomi_info: FeatureTable,
    pub seg_len_info: FeatureTable,
    pub expand_pairs: Option<ExpandPairTable>,
    /// Learned segmentations matched anywhere in the buffer
    pub idioms: Option<IdiomTable>,
    /// Learned segmentations that must cover the whole buffer
    pub full_idioms: Option<IdiomTable>,
}

impl SplitterModel {
    /// A model with empty tables; every probability lookup falls back.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(
        trans_info: FeatureTable,
        seg_info: FeatureTable,
        yomi_info: FeatureTable,
        seg_len_info: FeatureTable,
    ) -> Self {
        Self {
            trans_info,
            seg_info,
            yomi_info,
            seg_len_info,
            ..Self::default()
        }
    }

    pub fn with_expand_pairs(mut self, pairs: ExpandPairTable) -> Self {
        self.expand_pairs = Some(pairs);
        self
    }

    pub fn with_idioms(mut self, idioms: IdiomTable) -> Self {
        self.idioms = Some(idioms);
        self
    }

    pub fn with_full_idioms(mut self, idioms: IdiomTable) -> Self {
        self.full_idioms = Some(idioms);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Load every model file present in `dir`. Missing files leave the
    /// corresponding component empty; unreadable files are errors.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let table = |name: &str| -> anyhow::Result<FeatureTable> {
            let path = dir.join(name);
            if path.exists() {
                FeatureTable::load(&path)
            } else {
                tracing::warn!(path = %path.display(), "feature table missing, using fallbacks");
                Ok(FeatureTable::empty())
            }
        };

        let mut model = Self::with_tables(
            table(TRANS_TABLE_FILE)?,
            table(SEG_TABLE_FILE)?,
            table(YOMI_TABLE_FILE)?,
            table(SEG_LEN_TABLE_FILE)?,
        );

        let pairs_path = dir.join(EXPAND_PAIRS_FILE);
        if pairs_path.exists() {
            let pairs = ExpandPairTable::load_bincode(&pairs_path)
                .map_err(|e| anyhow::anyhow!("{}: {}", pairs_path.display(), e))?;
            model.expand_pairs = Some(pairs);
        }

        let idioms = |fst_name: &str, bin_name: &str| -> anyhow::Result<Option<IdiomTable>> {
            let fst_path = dir.join(fst_name);
            let bin_path = dir.join(bin_name);
            if fst_path.exists() && bin_path.exists() {
                Ok(Some(IdiomTable::load(&fst_path, &bin_path)?))
            } else {
                Ok(None)
            }
        };
        model.idioms = idioms(IDIOMS_FST_FILE, IDIOMS_BINCODE_FILE)?;
        model.full_idioms = idioms(FULL_IDIOMS_FST_FILE, FULL_IDIOMS_BINCODE_FILE)?;

        tracing::info!(
            dir = %dir.display(),
            trans = model.trans_info.len(),
            seg = model.seg_info.len(),
            yomi = model.yomi_info.len(),
            seg_len = model.seg_len_info.len(),
            "loaded splitter model"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::IdiomEntry;
    use crate::table::FeatureTableBuilder;

    #[test]
    fn load_dir_tolerates_missing_files() {
        let dir = std::env::temp_dir().join(format!("libkana_model_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut b = FeatureTableBuilder::new();
        b.add(&[1012], 1, 9);
        b.save(dir.join(TRANS_TABLE_FILE)).unwrap();

        let idioms = IdiomTable::build(vec![("あ", IdiomEntry::new().push(1, "亜"))]).unwrap();
        idioms
            .save(dir.join(IDIOMS_FST_FILE), dir.join(IDIOMS_BINCODE_FILE))
            .unwrap();

        let model = SplitterModel::load_dir(&dir).unwrap();
        assert_eq!(model.trans_info.len(), 1);
        assert!(model.seg_info.is_empty());
        assert!(model.expand_pairs.is_none());
        assert_eq!(model.idioms.as_ref().map(|t| t.len()), Some(1));
        assert!(model.full_idioms.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_table_is_an_error() {
        let dir = std::env::temp_dir().join(format!("libkana_model_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SEG_TABLE_FILE), [0u8, 1, 2]).unwrap();
        assert!(SplitterModel::load_dir(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
