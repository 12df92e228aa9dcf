use super::traits::ConfigSection;
use crate::error::{PanelCvError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Panel file, CSV or Parquet
    pub panel_path: Option<PathBuf>,
    /// Tuning results file, CSV or Parquet
    pub tuning_path: Option<PathBuf>,
    pub entity_column: String,
    pub date_column: String,
    pub min_dates: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            panel_path: None,
            tuning_path: None,
            entity_column: "symbol".to_string(),
            date_column: "date".to_string(),
            min_dates: 1,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<()> {
        if self.entity_column.is_empty() || self.date_column.is_empty() {
            return Err(PanelCvError::Configuration(
                "Entity and date column names must not be empty".to_string()
            ));
        }
        if self.entity_column == self.date_column {
            return Err(PanelCvError::Configuration(
                "Entity and date columns must differ".to_string()
            ));
        }
        Ok(())
    }
}
