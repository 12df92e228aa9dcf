use super::base::DataSplitter;
use super::types::{CvConfig, DateRange, Split};
use crate::error::{PanelCvError, Result};
use chrono::NaiveDate;
use polars::prelude::IdxSize;
use std::collections::HashMap;

/// Walk-backward splitter over a panel of (entity, date) rows.
///
/// Split 0 tests on the most recent `test_period_length` dates; each further
/// split steps one test block back in time. Every train window ends
/// `lookahead` dates before its test window starts, so forward-looking labels
/// computed over that horizon cannot leak into training.
#[derive(Debug, Clone)]
pub struct MultipleTimeSeriesCV {
    config: CvConfig,
}

impl MultipleTimeSeriesCV {
    pub fn new(config: CvConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { config })
    }

    pub fn with_lengths(
        n_splits: usize,
        train_period_length: usize,
        test_period_length: usize,
        lookahead: usize,
    ) -> Result<Self> {
        Self::new(CvConfig::new(
            n_splits,
            train_period_length,
            test_period_length,
            lookahead,
        )?)
    }
}

impl DataSplitter for MultipleTimeSeriesCV {
    fn split(&self, row_dates: &[NaiveDate]) -> Result<Splits> {
        let mut dates_desc: Vec<NaiveDate> = row_dates.to_vec();
        dates_desc.sort_unstable_by(|a, b| b.cmp(a));
        dates_desc.dedup();

        let required = self.config.required_dates()?;
        if dates_desc.len() < required {
            return Err(PanelCvError::InsufficientHistory {
                required,
                available: dates_desc.len(),
            });
        }

        // Bucket row positions by their date's place in the descending index.
        let rank_of: HashMap<NaiveDate, usize> = dates_desc
            .iter()
            .enumerate()
            .map(|(rank, date)| (*date, rank))
            .collect();
        let mut buckets: Vec<Vec<IdxSize>> = vec![Vec::new(); dates_desc.len()];
        for (position, date) in row_dates.iter().enumerate() {
            buckets[rank_of[date]].push(position as IdxSize);
        }

        log::debug!(
            "Splitting {} rows over {} distinct dates ({} required)",
            row_dates.len(),
            dates_desc.len(),
            required
        );

        Ok(Splits {
            config: self.config,
            dates_desc,
            buckets,
            next_split: 0,
        })
    }

    fn config(&self) -> &CvConfig {
        &self.config
    }
}

/// Lazy, single-pass sequence of splits, most recent first.
#[derive(Debug)]
pub struct Splits {
    config: CvConfig,
    dates_desc: Vec<NaiveDate>,
    buckets: Vec<Vec<IdxSize>>,
    next_split: usize,
}

impl Splits {
    fn window(&self, start: usize, len: usize) -> (Vec<IdxSize>, DateRange) {
        let end = start + len;
        let mut positions: Vec<IdxSize> = self.buckets[start..end]
            .iter()
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        let range = DateRange {
            start: self.dates_desc[end - 1],
            end: self.dates_desc[start],
        };
        (positions, range)
    }
}

impl Iterator for Splits {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        let i = self.next_split;
        if i >= self.config.n_splits {
            return None;
        }
        self.next_split += 1;

        let test_start = i * self.config.test_period_length;
        let train_start = test_start + self.config.test_period_length + self.config.lookahead;

        let (test_positions, test_range) = self.window(test_start, self.config.test_period_length);
        let (train_positions, train_range) =
            self.window(train_start, self.config.train_period_length);

        log::debug!(
            "Split {}: train {} ({} rows), test {} ({} rows)",
            i,
            train_range,
            train_positions.len(),
            test_range,
            test_positions.len()
        );

        Some(Split {
            split_num: i,
            train_positions,
            test_positions,
            train_range,
            test_range,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.n_splits - self.next_split;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Splits {}
