use super::connectors::{DataValidator, DatasetMetadata};
use crate::error::{PanelCvError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

/// A frame of observations keyed by (entity, date).
///
/// The date column is normalised to polars `Date` on construction and the
/// per-row dates are kept alongside the frame, so splitting never has to go
/// back through polars. Row order is preserved as loaded.
#[derive(Debug, Clone)]
pub struct Panel {
    frame: DataFrame,
    entity_column: String,
    date_column: String,
    row_dates: Vec<NaiveDate>,
}

impl Panel {
    pub fn new(frame: DataFrame, entity_column: &str, date_column: &str) -> Result<Self> {
        for name in [entity_column, date_column] {
            if frame.column(name).is_err() {
                return Err(PanelCvError::DataLoading(format!(
                    "Missing key column '{}'",
                    name
                )));
            }
        }

        let frame = DataValidator::normalize_date_column(frame, date_column)?;
        let row_dates = DataValidator::date_values(&frame, date_column)?;
        DataValidator::validate_unique_keys(&frame, entity_column, &row_dates)?;

        Ok(Self {
            frame,
            entity_column: entity_column.to_string(),
            date_column: date_column.to_string(),
            row_dates,
        })
    }

    /// Same keys, different payload columns. Keys are revalidated.
    pub fn with_frame(&self, frame: DataFrame) -> Result<Self> {
        if frame.height() != self.height() {
            return Err(PanelCvError::Validation(format!(
                "Replacement frame has {} rows, panel has {}",
                frame.height(),
                self.height()
            )));
        }
        Self::new(frame, &self.entity_column, &self.date_column)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn entity_column(&self) -> &str {
        &self.entity_column
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn row_dates(&self) -> &[NaiveDate] {
        &self.row_dates
    }

    /// Distinct dates, most recent first
    pub fn unique_dates_desc(&self) -> Vec<NaiveDate> {
        let mut dates = self.row_dates.clone();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        dates
    }

    /// Rows at the given positions, in the given order
    pub fn take(&self, positions: &[IdxSize]) -> Result<DataFrame> {
        let idx = IdxCa::from_vec("idx".into(), positions.to_vec());
        Ok(self.frame.take(&idx)?)
    }

    /// Column names that are neither keys nor listed in `exclude`
    pub fn feature_columns(&self, exclude: &[String]) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| {
                name != &self.entity_column
                    && name != &self.date_column
                    && !exclude.contains(name)
            })
            .collect()
    }

    pub fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<DatasetMetadata> {
        let dates = self.unique_dates_desc();
        let num_entities = self.frame.column(&self.entity_column)?.n_unique()?;

        Ok(DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: self.frame.height(),
            num_columns: self.frame.width(),
            columns: self
                .frame
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            entity_column: self.entity_column.clone(),
            date_column: self.date_column.clone(),
            num_entities,
            num_dates: dates.len(),
            date_range: dates.last().copied().zip(dates.first().copied()),
        })
    }
}

/// Float values of one column, nulls kept as `None`
pub fn column_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let values = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}
