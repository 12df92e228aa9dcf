use crate::data::connectors::load_frame;
use crate::error::{PanelCvError, Result};
use crate::ml::models::{ModelFamily, ModelParams, ParamValue};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOOKAHEAD: &str = "lookahead";
const TRAIN_LENGTH: &str = "train_length";
const TEST_LENGTH: &str = "test_length";
const NUM_BOOST_ROUND: &str = "num_boost_round";
const IC: &str = "ic";
const META_COLUMNS: [&str; 5] = [LOOKAHEAD, TRAIN_LENGTH, TEST_LENGTH, NUM_BOOST_ROUND, IC];

/// One tuned configuration chosen for prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamCandidate {
    /// 1-based position in the IC ranking
    pub rank: usize,
    pub lookahead: usize,
    pub train_length: usize,
    pub test_length: usize,
    pub ic: f64,
    pub params: ModelParams,
}

#[derive(Debug, Clone)]
struct TuningRow {
    lookahead: usize,
    train_length: usize,
    test_length: usize,
    num_boost_round: usize,
    ic: f64,
    overrides: Vec<(String, ParamValue)>,
}

/// Results of an earlier hyperparameter search for one model family.
///
/// Expected columns: `lookahead`, `train_length`, `test_length`,
/// `num_boost_round`, `ic`; every other column is a hyperparameter.
#[derive(Debug, Clone)]
pub struct TuningResults {
    family: ModelFamily,
    rows: Vec<TuningRow>,
}

impl TuningResults {
    pub fn load<P: AsRef<Path>>(path: P, family: ModelFamily) -> Result<Self> {
        let df = load_frame(&path)?;
        let results = Self::from_frame(&df, family)?;
        log::info!(
            "Loaded {} {} tuning results from {}",
            results.len(),
            family,
            path.as_ref().display()
        );
        Ok(results)
    }

    pub fn from_frame(df: &DataFrame, family: ModelFamily) -> Result<Self> {
        let lookahead = count_column(df, LOOKAHEAD)?;
        let train_length = count_column(df, TRAIN_LENGTH)?;
        let test_length = count_column(df, TEST_LENGTH)?;
        let num_boost_round = count_column(df, NUM_BOOST_ROUND)?;
        let ic = df.column(IC)?.cast(&DataType::Float64)?;
        let ic = ic.f64()?;

        let param_columns: Vec<(String, Vec<Option<ParamValue>>)> = df
            .get_columns()
            .iter()
            .filter(|col| !META_COLUMNS.contains(&col.name().as_str()))
            .map(|col| Ok((col.name().to_string(), param_values(col)?)))
            .collect::<Result<_>>()?;

        let rows = (0..df.height())
            .map(|row| {
                let ic = ic.get(row).ok_or_else(|| {
                    PanelCvError::Validation(format!("Missing ic at tuning row {}", row))
                })?;
                let overrides = param_columns
                    .iter()
                    .filter_map(|(name, values)| {
                        values[row].clone().map(|value| (name.clone(), value))
                    })
                    .collect();
                Ok(TuningRow {
                    lookahead: lookahead[row],
                    train_length: train_length[row],
                    test_length: test_length[row],
                    num_boost_round: num_boost_round[row],
                    ic,
                    overrides,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { family, rows })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct lookaheads present, ascending
    pub fn lookaheads(&self) -> Vec<usize> {
        let mut lookaheads: Vec<usize> = self.rows.iter().map(|r| r.lookahead).collect();
        lookaheads.sort_unstable();
        lookaheads.dedup();
        lookaheads
    }

    /// Top `n` configurations for `lookahead` by IC, best first.
    ///
    /// Ties keep file order; NaN scores rank last.
    pub fn best(&self, lookahead: usize, n: usize) -> Vec<ParamCandidate> {
        let mut rows: Vec<&TuningRow> = self
            .rows
            .iter()
            .filter(|r| r.lookahead == lookahead)
            .collect();
        rows.sort_by(|a, b| match (a.ic.is_nan(), b.ic.is_nan()) {
            (false, false) => b.ic.total_cmp(&a.ic),
            (nan_a, nan_b) => nan_a.cmp(&nan_b),
        });

        rows.into_iter()
            .take(n)
            .enumerate()
            .map(|(i, row)| ParamCandidate {
                rank: i + 1,
                lookahead: row.lookahead,
                train_length: row.train_length,
                test_length: row.test_length,
                ic: row.ic,
                params: ModelParams::base(self.family, row.num_boost_round)
                    .with_overrides(row.overrides.iter().cloned()),
            })
            .collect()
    }
}

fn count_column(df: &DataFrame, name: &str) -> Result<Vec<usize>> {
    let values = df.column(name)?.cast(&DataType::Int64)?;
    values
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v >= 0 => Ok(v as usize),
            _ => Err(PanelCvError::Validation(format!(
                "Column '{}' needs a non-negative integer at tuning row {}",
                name, row
            ))),
        })
        .collect()
}

fn param_values(col: &Column) -> Result<Vec<Option<ParamValue>>> {
    let dtype = col.dtype();
    let values = if dtype.is_bool() {
        col.bool()?.into_iter().map(|v| v.map(ParamValue::Bool)).collect()
    } else if dtype.is_integer() {
        let ints = col.cast(&DataType::Int64)?;
        ints.i64()?.into_iter().map(|v| v.map(ParamValue::Int)).collect()
    } else if dtype.is_float() {
        let floats = col.cast(&DataType::Float64)?;
        floats.f64()?.into_iter().map(|v| v.map(ParamValue::Float)).collect()
    } else {
        let text = col.cast(&DataType::String)?;
        text.str()?
            .into_iter()
            .map(|v| v.map(|s| ParamValue::Text(s.to_string())))
            .collect()
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn sample() -> TuningResults {
        let df = df! {
            "lookahead" => &[1i64, 1, 1, 5],
            "train_length" => &[1134i64, 252, 756, 1134],
            "test_length" => &[63i64, 21, 63, 21],
            "num_boost_round" => &[250i64, 500, 1000, 100],
            "ic" => &[0.021, 0.034, f64::NAN, 0.05],
            "learning_rate" => &[0.01, 0.1, 0.3, 0.1],
            "num_leaves" => &[Some(32i64), None, Some(128), Some(8)],
        }
        .unwrap();
        TuningResults::from_frame(&df, ModelFamily::LightGbm).unwrap()
    }

    #[test]
    fn test_best_ranks_by_ic() {
        let best = sample().best(1, 2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].rank, 1);
        assert_eq!(best[0].train_length, 252);
        assert_eq!(best[0].params.num_boost_round(), 500);
        assert_eq!(best[1].train_length, 1134);
        assert_eq!(best[1].params.get("num_leaves"), Some(&ParamValue::Int(32)));
    }

    #[test]
    fn test_nan_ranks_last_and_nulls_are_skipped() {
        let best = sample().best(1, 10);
        assert_eq!(best.len(), 3);
        assert!(best[2].ic.is_nan());
        assert_eq!(best[1].params.get("learning_rate"), Some(&ParamValue::Float(0.01)));
        assert_eq!(best[0].params.get("num_leaves"), None);
        // Base parameters survive the merge.
        assert!(best[0].params.get("objective").is_some());
    }

    #[test]
    fn test_lookaheads() {
        assert_eq!(sample().lookaheads(), vec![1, 5]);
        assert!(sample().best(21, 3).is_empty());
    }

    #[test]
    fn test_missing_meta_column() {
        let df = df! { "lookahead" => &[1i64], "ic" => &[0.1] }.unwrap();
        assert!(TuningResults::from_frame(&df, ModelFamily::CatBoost).is_err());
    }
}
