use super::types::KeyColumn;
use crate::error::{PanelCvError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;

/// Days between 0001-01-01 and the Unix epoch, the offset of polars `Date` values.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct DataValidator;

impl DataValidator {
    /// Resolve a key column: the configured name if present, otherwise the first
    /// alias found. Falling back to an alias is logged as a warning.
    pub fn resolve_key_column(
        df: &DataFrame,
        key: KeyColumn,
        configured: &str,
    ) -> Result<String> {
        let columns = df.get_column_names();
        if columns.iter().any(|col| col.as_str() == configured) {
            return Ok(configured.to_string());
        }
        let alias = key
            .aliases()
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
            .ok_or_else(|| {
                PanelCvError::DataLoading(format!(
                    "Missing {} column '{}' (tried aliases: {:?})",
                    key.as_str(),
                    configured,
                    key.aliases()
                ))
            })?;

        log::warn!(
            "Configured {} column '{}' not found; using '{}' instead",
            key.as_str(),
            configured,
            alias
        );
        Ok(alias.to_string())
    }

    /// Cast or parse the date column to polars `Date`
    pub fn normalize_date_column(mut df: DataFrame, name: &str) -> Result<DataFrame> {
        let column = df.column(name)?;
        match column.dtype().clone() {
            DataType::Date => Ok(df),
            DataType::Datetime(_, _) => {
                let dates = column.cast(&DataType::Date)?;
                df.with_column(dates)?;
                Ok(df)
            }
            DataType::String => {
                let parsed: Vec<Option<NaiveDate>> = column
                    .str()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, value)| value.map(|s| parse_date(s, row)).transpose())
                    .collect::<Result<_>>()?;
                df.with_column(Series::new(name.into(), parsed))?;
                Ok(df)
            }
            other => Err(PanelCvError::DataLoading(format!(
                "Date column '{}' must be a date, datetime or string, found {:?}",
                name, other
            ))),
        }
    }

    /// Per-row dates of an already normalized `Date` column; nulls are rejected
    pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
        let days = df.column(name)?.cast(&DataType::Int32)?;
        days.i32()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.ok_or_else(|| {
                    PanelCvError::Validation(format!("Null date in column '{}' at row {}", name, row))
                })?;
                NaiveDate::from_num_days_from_ce_opt(value + EPOCH_DAYS_FROM_CE).ok_or_else(|| {
                    PanelCvError::Validation(format!("Date out of range at row {}: {}", row, value))
                })
            })
            .collect()
    }

    /// Every (entity, date) key must be present and unique
    pub fn validate_unique_keys(
        df: &DataFrame,
        entity_column: &str,
        row_dates: &[NaiveDate],
    ) -> Result<()> {
        let entities = df.column(entity_column)?.cast(&DataType::String)?;
        let entities = entities.str()?;

        let mut seen = HashSet::with_capacity(row_dates.len());
        for (row, (entity, date)) in entities.into_iter().zip(row_dates).enumerate() {
            let entity = entity.ok_or_else(|| {
                PanelCvError::Validation(format!(
                    "Null entity in column '{}' at row {}",
                    entity_column, row
                ))
            })?;
            if !seen.insert((entity, *date)) {
                return Err(PanelCvError::Validation(format!(
                    "Duplicate key at row {}: ({}, {})",
                    row, entity, date
                )));
            }
        }
        Ok(())
    }

    /// Check for minimum number of distinct dates
    pub fn validate_minimum_dates(num_dates: usize, min_dates: usize) -> Result<()> {
        if num_dates < min_dates {
            return Err(PanelCvError::DataLoading(format!(
                "Insufficient data: {} distinct dates, minimum {} required",
                num_dates, min_dates
            )));
        }
        Ok(())
    }

    /// Check for null values in every column
    pub fn check_nulls(df: &DataFrame) -> Vec<(String, usize)> {
        df.get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }
}

fn parse_date(value: &str, row: usize) -> Result<NaiveDate> {
    let trimmed = value.trim();
    // Datetime strings keep their date part.
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
        PanelCvError::DataLoading(format!("Invalid date '{}' at row {}: {}", value, row, e))
    })
}
