use super::base::*;
use crate::config::{traits::ConfigSection, WorkflowConfig};
use crate::data::{column_values, encode_categoricals, Panel, PredictionStore};
use crate::engines::metrics::InformationCoefficient;
use crate::engines::splitters::{DataSplitter, MultipleTimeSeriesCV, Split};
use crate::error::{PanelCvError, Result, WindowKind};
use crate::ml::models::Regressor;
use crate::ml::tuning::{ParamCandidate, TuningResults};
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;

/// Refits the best tuned configurations on every walk-backward split and
/// collects out-of-sample predictions.
pub struct PredictionRunner<R: Regressor> {
    regressor: R,
    config: WorkflowConfig,
    cancel: CancellationToken,
}

/// Predictions and report of one candidate
#[derive(Debug, Clone)]
pub struct CandidateRun {
    pub report: CandidateReport,
    pub predictions: Option<DataFrame>,
}

/// Predictions and report of one lookahead
#[derive(Debug, Clone)]
pub struct LookaheadRun {
    pub report: LookaheadReport,
    pub predictions: Option<DataFrame>,
}

/// Everything a split needs from its lookahead, computed once
struct LabelContext<'a> {
    panel: &'a Panel,
    label: String,
    labels: Vec<Option<f64>>,
    features: Vec<String>,
}

impl<'a> LabelContext<'a> {
    /// Positions whose label is present and finite
    fn labelled(&self, positions: &[IdxSize]) -> Vec<IdxSize> {
        positions
            .iter()
            .copied()
            .filter(|&p| self.labels[p as usize].map_or(false, f64::is_finite))
            .collect()
    }

    fn label_values(&self, positions: &[IdxSize]) -> Vec<f64> {
        positions
            .iter()
            .filter_map(|&p| self.labels[p as usize])
            .collect()
    }

    fn feature_rows(&self, positions: &[IdxSize]) -> Result<DataFrame> {
        let rows = self.panel.take(positions)?;
        Ok(rows.select(self.features.iter().map(|s| s.as_str()))?)
    }
}

/// Append-only prediction table keyed by (rank, split, row position)
struct PredictionTable {
    frame: Option<DataFrame>,
    keys: HashSet<(u32, u32, u64)>,
}

impl PredictionTable {
    fn new() -> Self {
        Self {
            frame: None,
            keys: HashSet::new(),
        }
    }

    fn append(&mut self, rows: &DataFrame) -> Result<()> {
        let rank = rows.column("rank")?;
        let split = rows.column("split")?;
        let position = rows.column("row")?.cast(&DataType::UInt64)?;
        for ((rank, split), position) in rank
            .u32()?
            .into_iter()
            .zip(split.u32()?)
            .zip(position.u64()?)
        {
            let key = (
                rank.unwrap_or_default(),
                split.unwrap_or_default(),
                position.unwrap_or_default(),
            );
            if !self.keys.insert(key) {
                return Err(PanelCvError::Validation(format!(
                    "Duplicate prediction for rank {}, split {}, row {}",
                    key.0, key.1, key.2
                )));
            }
        }

        match self.frame.as_mut() {
            Some(frame) => {
                frame.vstack_mut(rows)?;
            }
            None => self.frame = Some(rows.clone()),
        }
        Ok(())
    }

    fn into_frame(self) -> Option<DataFrame> {
        self.frame
    }
}

impl<R: Regressor> PredictionRunner<R> {
    pub fn new(regressor: R, config: WorkflowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            regressor,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Panel with categorical columns replaced by integer codes
    pub fn prepare(&self, panel: &Panel) -> Result<Panel> {
        if self.config.categorical_columns.is_empty() {
            return Ok(panel.clone());
        }
        let encoded = encode_categoricals(panel.frame(), &self.config.categorical_columns)?;
        panel.with_frame(encoded)
    }

    /// Run every configured lookahead and store one table per lookahead
    pub fn run(
        &self,
        panel: &Panel,
        tuning: &TuningResults,
        store: &PredictionStore,
    ) -> Result<Vec<LookaheadReport>> {
        if tuning.family() != self.regressor.family() {
            return Err(PanelCvError::Configuration(format!(
                "Tuning results are for {}, regressor fits {}",
                tuning.family(),
                self.regressor.family()
            )));
        }

        let panel = self.prepare(panel)?;
        let mut reports = Vec::with_capacity(self.config.lookaheads.len());

        for &lookahead in &self.config.lookaheads {
            let LookaheadRun {
                mut report,
                predictions,
            } = self.run_lookahead(&panel, tuning, lookahead)?;

            match predictions {
                Some(mut table) => {
                    let path = store.put(self.regressor.family(), lookahead, &mut table)?;
                    report.stored_at = Some(path);
                }
                None => log::warn!(
                    "No predictions for {} lookahead {}; nothing stored",
                    self.regressor.family(),
                    lookahead
                ),
            }
            reports.push(report);
        }

        Ok(reports)
    }

    /// Refit the top candidates for one lookahead
    pub fn run_lookahead(
        &self,
        panel: &Panel,
        tuning: &TuningResults,
        lookahead: usize,
    ) -> Result<LookaheadRun> {
        let context = self.label_context(panel, lookahead)?;

        let candidates = tuning.best(lookahead, self.config.top_n);
        if candidates.is_empty() {
            log::warn!("No tuning results for lookahead {}", lookahead);
        }

        let mut table = PredictionTable::new();
        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let run = self.run_candidate_in(&context, candidate)?;
            if let Some(predictions) = &run.predictions {
                table.append(predictions)?;
            }
            reports.push(run.report);
        }

        let predictions = table.into_frame();
        let prediction_rows = predictions.as_ref().map_or(0, |df| df.height());

        Ok(LookaheadRun {
            report: LookaheadReport {
                family: self.regressor.family(),
                lookahead,
                label: context.label.clone(),
                candidates: reports,
                prediction_rows,
                stored_at: None,
            },
            predictions,
        })
    }

    /// Refit one candidate on every split of its own window lengths
    pub fn run_candidate(
        &self,
        panel: &Panel,
        candidate: &ParamCandidate,
    ) -> Result<CandidateRun> {
        let context = self.label_context(panel, candidate.lookahead)?;
        self.run_candidate_in(&context, candidate)
    }

    fn label_context<'a>(&self, panel: &'a Panel, lookahead: usize) -> Result<LabelContext<'a>> {
        let label = self.config.label_for(lookahead);
        let labels = column_values(panel.frame(), &label).map_err(|_| {
            PanelCvError::Validation(format!("Panel has no label column '{}'", label))
        })?;

        let mut excluded = self.config.all_labels();
        excluded.push(label.clone());
        excluded.extend(self.config.exclude_columns.iter().cloned());
        let features = panel.feature_columns(&excluded);
        if features.is_empty() {
            return Err(PanelCvError::Validation(
                "Panel has no feature columns".to_string(),
            ));
        }

        Ok(LabelContext {
            panel,
            label,
            labels,
            features,
        })
    }

    fn run_candidate_in(
        &self,
        context: &LabelContext<'_>,
        candidate: &ParamCandidate,
    ) -> Result<CandidateRun> {
        if candidate.params.family() != self.regressor.family() {
            return Err(PanelCvError::Configuration(format!(
                "Candidate {} holds {} parameters, regressor fits {}",
                candidate.rank,
                candidate.params.family(),
                self.regressor.family()
            )));
        }

        let n_splits = self.config.n_splits_for(candidate.test_length)?;
        let cv = MultipleTimeSeriesCV::with_lengths(
            n_splits,
            candidate.train_length,
            candidate.test_length,
            candidate.lookahead,
        )?;
        let splits: Vec<Split> = cv.split_panel(context.panel)?.collect();

        log::info!(
            "Candidate {} for '{}': {} splits, train {} / test {} dates",
            candidate.rank,
            context.label,
            splits.len(),
            candidate.train_length,
            candidate.test_length
        );

        let run_one = |split: &Split| match self.run_split(context, candidate, split) {
            Ok((score, rows)) => (SplitOutcome::Success(score), Some(rows)),
            Err(e) => {
                log::warn!(
                    "Candidate {} split {} (train {}, test {}) failed: {}",
                    candidate.rank,
                    split.split_num,
                    split.train_range,
                    split.test_range,
                    e
                );
                (SplitOutcome::Failed(SplitFailure::new(split, e)), None)
            }
        };

        let results: Vec<(SplitOutcome, Option<DataFrame>)> = if self.config.parallel {
            splits.par_iter().map(run_one).collect()
        } else {
            splits.iter().map(run_one).collect()
        };

        let mut outcomes = Vec::with_capacity(results.len());
        let mut predictions: Option<DataFrame> = None;
        for (outcome, rows) in results {
            if let Some(rows) = rows {
                match predictions.as_mut() {
                    Some(frame) => {
                        frame.vstack_mut(&rows)?;
                    }
                    None => predictions = Some(rows),
                }
            }
            outcomes.push(outcome);
        }

        let scores: Vec<&SplitScore> = outcomes
            .iter()
            .filter_map(|o| match o {
                SplitOutcome::Success(score) => Some(score),
                SplitOutcome::Failed(_) => None,
            })
            .collect();
        let aggregate_metrics = aggregate_metrics(&scores);

        Ok(CandidateRun {
            report: CandidateReport {
                rank: candidate.rank,
                lookahead: candidate.lookahead,
                train_length: candidate.train_length,
                test_length: candidate.test_length,
                n_splits,
                tuning_ic: candidate.ic,
                params: candidate.params.clone(),
                outcomes,
                aggregate_metrics,
            },
            predictions,
        })
    }

    fn run_split(
        &self,
        context: &LabelContext<'_>,
        candidate: &ParamCandidate,
        split: &Split,
    ) -> Result<(SplitScore, DataFrame)> {
        if self.cancel.is_cancelled() {
            return Err(PanelCvError::Cancelled);
        }

        let train_positions = context.labelled(&split.train_positions);
        if train_positions.is_empty() {
            return Err(PanelCvError::EmptyWindow {
                split: split.split_num,
                window: WindowKind::Train,
            });
        }
        let test_positions = context.labelled(&split.test_positions);
        if test_positions.is_empty() {
            return Err(PanelCvError::EmptyWindow {
                split: split.split_num,
                window: WindowKind::Test,
            });
        }

        let x_train = context.feature_rows(&train_positions)?;
        let y_train = context.label_values(&train_positions);
        let predictor = self
            .regressor
            .fit(&x_train, &y_train, &candidate.params)?;

        let x_test = context.feature_rows(&test_positions)?;
        let actual = context.label_values(&test_positions);
        let predicted = predictor.predict(&x_test)?;
        if predicted.len() != actual.len() {
            return Err(PanelCvError::ModelFit(format!(
                "Predictor returned {} values for {} rows",
                predicted.len(),
                actual.len()
            )));
        }

        let row_dates = context.panel.row_dates();
        let dates: Vec<NaiveDate> = test_positions
            .iter()
            .map(|&p| row_dates[p as usize])
            .collect();
        let metrics = InformationCoefficient::calculate(&dates, &actual, &predicted);

        let feature_importance = predictor.feature_importance().map(|importance| {
            predictor
                .feature_names()
                .into_iter()
                .zip(importance)
                .collect()
        });

        let n = test_positions.len();
        let panel = context.panel;
        let mut rows = panel
            .take(&test_positions)?
            .select([panel.entity_column(), panel.date_column()])?;
        rows.with_column(Series::new("rank".into(), vec![candidate.rank as u32; n]))?;
        rows.with_column(Series::new("split".into(), vec![split.split_num as u32; n]))?;
        rows.with_column(Series::new("row".into(), test_positions.clone()))?;
        rows.with_column(Series::new("actual".into(), actual))?;
        rows.with_column(Series::new("predicted".into(), predicted))?;

        let score = SplitScore {
            split_num: split.split_num,
            train_range: split.train_range,
            test_range: split.test_range,
            train_rows: train_positions.len(),
            test_rows: n,
            metrics,
            feature_importance,
        };

        Ok((score, rows))
    }
}
