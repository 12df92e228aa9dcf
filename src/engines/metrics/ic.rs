// src/engines/metrics/ic.rs
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Rank correlation between predictions and realised returns.
pub struct InformationCoefficient;

impl InformationCoefficient {
    /// Overall and per-date IC of one prediction set.
    ///
    /// Keys: `ic` (pooled), `daily_ic_mean`, `daily_ic_std`, `n_days`.
    pub fn calculate(dates: &[NaiveDate], actual: &[f64], predicted: &[f64]) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();

        if let Some(ic) = Self::spearman(actual, predicted) {
            metrics.insert("ic".to_string(), ic);
        }

        let daily = Self::daily(dates, actual, predicted);
        metrics.insert("n_days".to_string(), daily.len() as f64);
        if !daily.is_empty() {
            let values: Vec<f64> = daily.values().copied().collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            metrics.insert("daily_ic_mean".to_string(), mean);
            metrics.insert("daily_ic_std".to_string(), sample_std(&values, mean));
        }

        metrics
    }

    /// Spearman correlation with average ranks for ties.
    ///
    /// `None` when fewer than two pairs are given or either side is constant.
    pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        pearson(&average_ranks(x), &average_ranks(y))
    }

    /// IC per date; dates with fewer than two rows or a constant side are skipped
    pub fn daily(dates: &[NaiveDate], actual: &[f64], predicted: &[f64]) -> BTreeMap<NaiveDate, f64> {
        let mut by_date: BTreeMap<NaiveDate, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for ((date, a), p) in dates.iter().zip(actual).zip(predicted) {
            let entry = by_date.entry(*date).or_default();
            entry.0.push(*a);
            entry.1.push(*p);
        }

        by_date
            .into_iter()
            .filter_map(|(date, (a, p))| Self::spearman(&a, &p).map(|ic| (date, ic)))
            .collect()
    }
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; ties share the mean of their positions.
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Sample standard deviation (n - 1); zero for fewer than two values
pub(crate) fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }

    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}
