use crate::engines::metrics::ic::sample_std;
use crate::engines::splitters::{DateRange, Split};
use crate::ml::models::{ModelFamily, ModelParams};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a runner and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitScore {
    pub split_num: usize,
    pub train_range: DateRange,
    pub test_range: DateRange,
    pub train_rows: usize,
    pub test_rows: usize,
    pub metrics: HashMap<String, f64>,
    pub feature_importance: Option<Vec<(String, f64)>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitFailure {
    pub split_num: usize,
    pub train_range: DateRange,
    pub test_range: DateRange,
    pub cause: String,
}

impl SplitFailure {
    pub fn new(split: &Split, cause: impl ToString) -> Self {
        Self {
            split_num: split.split_num,
            train_range: split.train_range,
            test_range: split.test_range,
            cause: cause.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SplitOutcome {
    Success(SplitScore),
    Failed(SplitFailure),
}

impl SplitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Per-split outcomes of one tuned configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub rank: usize,
    pub lookahead: usize,
    pub train_length: usize,
    pub test_length: usize,
    pub n_splits: usize,
    pub tuning_ic: f64,
    pub params: ModelParams,
    pub outcomes: Vec<SplitOutcome>,
    pub aggregate_metrics: HashMap<String, f64>,
}

impl CandidateReport {
    pub fn scores(&self) -> impl Iterator<Item = &SplitScore> {
        self.outcomes.iter().filter_map(|o| match o {
            SplitOutcome::Success(score) => Some(score),
            SplitOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &SplitFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            SplitOutcome::Failed(failure) => Some(failure),
            SplitOutcome::Success(_) => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookaheadReport {
    pub family: ModelFamily,
    pub lookahead: usize,
    pub label: String,
    pub candidates: Vec<CandidateReport>,
    pub prediction_rows: usize,
    pub stored_at: Option<PathBuf>,
}

impl LookaheadReport {
    pub fn failed_splits(&self) -> usize {
        self.candidates.iter().map(|c| c.failures().count()).sum()
    }
}

/// Mean, std, min and max of every metric across successful splits
pub(crate) fn aggregate_metrics(scores: &[&SplitScore]) -> HashMap<String, f64> {
    let mut aggregated = HashMap::new();

    if scores.is_empty() {
        return aggregated;
    }

    let mut metric_names: Vec<&String> = scores.iter().flat_map(|s| s.metrics.keys()).collect();
    metric_names.sort();
    metric_names.dedup();

    for metric_name in metric_names {
        let values: Vec<f64> = scores
            .iter()
            .filter_map(|s| s.metrics.get(metric_name).copied())
            .filter(|v| v.is_finite())
            .collect();

        if !values.is_empty() {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let std = sample_std(&values, mean);

            aggregated.insert(format!("{}_mean", metric_name), mean);
            aggregated.insert(format!("{}_std", metric_name), std);
            aggregated.insert(format!("{}_min", metric_name), values.iter().copied().fold(f64::INFINITY, f64::min));
            aggregated.insert(format!("{}_max", metric_name), values.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        }
    }

    // Lower spread of daily IC across splits = more consistent
    if let Some(ic_std) = aggregated.get("daily_ic_mean_std") {
        let consistency = 1.0 / (1.0 + ic_std);
        aggregated.insert("consistency_score".to_string(), consistency);
    }

    aggregated
}
