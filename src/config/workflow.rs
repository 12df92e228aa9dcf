use super::traits::ConfigSection;
use crate::error::{PanelCvError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Forward-return horizons to predict, in trading days
    pub lookaheads: Vec<usize>,
    /// Number of best tuned configurations to refit per lookahead
    pub top_n: usize,
    /// Out-of-sample span covered by the splits; n_splits = this / test length
    pub oos_period_length: usize,
    /// Label column name, `{lookahead}` or `{lookahead:02}` is substituted
    pub label_template: String,
    pub categorical_columns: Vec<String>,
    /// Extra non-feature columns
    pub exclude_columns: Vec<String>,
    pub store_dir: PathBuf,
    pub parallel: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            lookaheads: vec![1, 5, 21],
            top_n: 10,
            oos_period_length: 252,
            label_template: "r{lookahead:02}_fwd".to_string(),
            categorical_columns: Vec::new(),
            exclude_columns: Vec::new(),
            store_dir: PathBuf::from("predictions"),
            parallel: true,
        }
    }
}

impl WorkflowConfig {
    pub fn label_for(&self, lookahead: usize) -> String {
        self.label_template
            .replace("{lookahead:02}", &format!("{:02}", lookahead))
            .replace("{lookahead}", &lookahead.to_string())
    }

    /// Every configured label, so no horizon's label is used as a feature
    pub fn all_labels(&self) -> Vec<String> {
        self.lookaheads.iter().map(|&l| self.label_for(l)).collect()
    }

    pub fn n_splits_for(&self, test_length: usize) -> Result<usize> {
        if test_length == 0 || test_length > self.oos_period_length {
            return Err(PanelCvError::Configuration(format!(
                "Test length {} does not fit in an out-of-sample period of {} dates",
                test_length, self.oos_period_length
            )));
        }
        Ok(self.oos_period_length / test_length)
    }
}

impl ConfigSection for WorkflowConfig {
    fn section_name() -> &'static str {
        "workflow"
    }

    fn validate(&self) -> Result<()> {
        if self.lookaheads.is_empty() || self.lookaheads.contains(&0) {
            return Err(PanelCvError::Configuration(
                "Lookaheads must be a non-empty list of positive integers".to_string()
            ));
        }
        if self.top_n == 0 {
            return Err(PanelCvError::Configuration(
                "top_n must be positive".to_string()
            ));
        }
        if self.oos_period_length == 0 {
            return Err(PanelCvError::Configuration(
                "Out-of-sample period length must be positive".to_string()
            ));
        }
        if !self.label_template.contains("{lookahead") && self.lookaheads.len() > 1 {
            return Err(PanelCvError::Configuration(
                "Label template must reference {lookahead} when several lookaheads are configured".to_string()
            ));
        }
        Ok(())
    }
}
