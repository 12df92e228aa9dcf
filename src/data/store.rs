use super::connectors::ParquetConnector;
use crate::config::WorkflowConfig;
use crate::error::{PanelCvError, Result};
use crate::ml::models::ModelFamily;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Prediction tables on disk, one Parquet file per (model family, lookahead).
pub struct PredictionStore {
    root: PathBuf,
}

impl PredictionStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(&config.store_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, family: ModelFamily, lookahead: usize) -> PathBuf {
        self.root
            .join(family.as_str())
            .join(format!("lookahead_{:02}.parquet", lookahead))
    }

    pub fn contains(&self, family: ModelFamily, lookahead: usize) -> bool {
        self.path_for(family, lookahead).is_file()
    }

    /// Write the table, replacing any earlier table under the same key
    pub fn put(
        &self,
        family: ModelFamily,
        lookahead: usize,
        table: &mut DataFrame,
    ) -> Result<PathBuf> {
        let path = self.path_for(family, lookahead);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ParquetConnector::save(&path, table)?;
        log::info!(
            "Stored {} predictions for {} lookahead {} at {}",
            table.height(),
            family,
            lookahead,
            path.display()
        );
        Ok(path)
    }

    pub fn get(&self, family: ModelFamily, lookahead: usize) -> Result<DataFrame> {
        let path = self.path_for(family, lookahead);
        if !path.is_file() {
            return Err(PanelCvError::DataLoading(format!(
                "No predictions stored for {} lookahead {}",
                family, lookahead
            )));
        }
        ParquetConnector::load(path)
    }
}
