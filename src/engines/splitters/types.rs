use crate::error::{PanelCvError, Result};
use chrono::NaiveDate;
use polars::prelude::IdxSize;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window lengths for the walk-backward splitter, all counted in unique dates.
///
/// Fields deserialise only from whole numbers; `2.6` is an error, not `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvConfig {
    #[serde(deserialize_with = "deserialize_count")]
    pub n_splits: usize,
    #[serde(deserialize_with = "deserialize_count")]
    pub train_period_length: usize,
    #[serde(deserialize_with = "deserialize_count")]
    pub test_period_length: usize,
    #[serde(deserialize_with = "deserialize_count")]
    pub lookahead: usize,
}

impl CvConfig {
    pub fn new(
        n_splits: usize,
        train_period_length: usize,
        test_period_length: usize,
        lookahead: usize,
    ) -> Result<Self> {
        let config = Self {
            n_splits,
            train_period_length,
            test_period_length,
            lookahead,
        };
        config.check()?;
        Ok(config)
    }

    pub(crate) fn check(&self) -> Result<()> {
        let fields = [
            ("n_splits", self.n_splits),
            ("train_period_length", self.train_period_length),
            ("test_period_length", self.test_period_length),
            ("lookahead", self.lookahead),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(PanelCvError::Configuration(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        self.required_dates()?;
        Ok(())
    }

    /// Distinct dates needed to produce every split.
    pub fn required_dates(&self) -> Result<usize> {
        self.n_splits
            .checked_mul(self.test_period_length)
            .and_then(|n| n.checked_add(self.train_period_length))
            .and_then(|n| n.checked_add(self.lookahead))
            .ok_or_else(|| {
                PanelCvError::Configuration(format!(
                    "{} splits of {} test dates plus {} train and {} lookahead dates overflow",
                    self.n_splits, self.test_period_length, self.train_period_length, self.lookahead
                ))
            })
    }
}

fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CountVisitor)
}

struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative whole number")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<usize, E> {
        usize::try_from(v).map_err(|_| E::custom(format!("{} is too large", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<usize, E> {
        usize::try_from(v).map_err(|_| E::custom(format!("{} is not a non-negative integer", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<usize, E> {
        if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
            Ok(v as usize)
        } else {
            Err(E::custom(format!("{} is not an integer", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<usize, E> {
        v.trim()
            .parse::<usize>()
            .map_err(|_| E::custom(format!("'{}' is not an integer", v)))
    }
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 12,
            train_period_length: 1134,
            test_period_length: 21,
            lookahead: 1,
        }
    }
}

/// Inclusive date range, oldest date first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One train/test pair of row positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub split_num: usize,
    pub train_positions: Vec<IdxSize>,
    pub test_positions: Vec<IdxSize>,
    pub train_range: DateRange,
    pub test_range: DateRange,
}

impl Split {
    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            split_num: self.split_num,
            train_range: self.train_range,
            test_range: self.test_range,
            train_rows: self.train_positions.len(),
            test_rows: self.test_positions.len(),
        }
    }
}

/// Row-free view of a split for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub split_num: usize,
    pub train_range: DateRange,
    pub test_range: DateRange,
    pub train_rows: usize,
    pub test_rows: usize,
}
