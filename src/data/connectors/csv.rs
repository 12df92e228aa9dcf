use crate::data::Panel;
use crate::error::{PanelCvError, Result};
use super::{
    types::KeyColumn,
    validator::DataValidator,
};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| PanelCvError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Write a frame as CSV with a header row
    pub fn save<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PanelCvError::DataLoading(format!("Failed to write CSV: {}", e)))?;
        Ok(())
    }
}

pub struct ParquetConnector;

impl ParquetConnector {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path)?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| PanelCvError::DataLoading(format!("Failed to read Parquet: {}", e)))
    }

    pub fn save<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
        let file = File::create(path)?;
        ParquetWriter::new(file)
            .finish(df)
            .map_err(|e| PanelCvError::DataLoading(format!("Failed to write Parquet: {}", e)))?;
        Ok(())
    }
}

/// Load a frame, picking the reader from the file extension (Parquet or CSV)
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let is_parquet = path
        .as_ref()
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false);
    if is_parquet {
        ParquetConnector::load(path)
    } else {
        CsvConnector::load(path)
    }
}

/// Load and validate a panel file
pub fn load_panel<P: AsRef<Path>>(
    path: P,
    entity_column: &str,
    date_column: &str,
    min_dates: Option<usize>,
) -> Result<Panel> {
    let df = load_frame(&path)?;

    let entity_column = DataValidator::resolve_key_column(&df, KeyColumn::Entity, entity_column)?;
    let date_column = DataValidator::resolve_key_column(&df, KeyColumn::Date, date_column)?;
    let panel = Panel::new(df, &entity_column, &date_column)?;

    let num_dates = panel.unique_dates_desc().len();
    DataValidator::validate_minimum_dates(num_dates, min_dates.unwrap_or(1))?;

    // Warn about nulls but don't fail
    let null_report = DataValidator::check_nulls(panel.frame());
    if !null_report.is_empty() {
        log::warn!("Null values detected: {:?}", null_report);
    }

    log::info!(
        "Loaded panel {}: {} rows, {} distinct dates",
        path.as_ref().display(),
        panel.height(),
        num_dates
    );

    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_csv_panel_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.csv");
        let mut df = df! {
            "Ticker" => &["A", "B", "A", "B"],
            "date" => &["2021-01-04", "2021-01-04", "2021-01-05", "2021-01-05"],
            "ret" => &[0.1, 0.2, 0.3, 0.4],
        }
        .unwrap();
        CsvConnector::save(&path, &mut df).unwrap();

        let panel = load_panel(&path, "symbol", "date", Some(2)).unwrap();
        assert_eq!(panel.entity_column(), "Ticker");
        assert_eq!(panel.height(), 4);
        assert_eq!(panel.unique_dates_desc().len(), 2);
    }

    #[test]
    fn test_parquet_panel_keeps_date_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.parquet");
        let day = chrono::NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let mut df = df! {
            "symbol" => &["A", "B", "A"],
            "date" => &[day, day, day.succ_opt().unwrap()],
            "r01_fwd" => &[0.01, -0.02, 0.03],
        }
        .unwrap();
        ParquetConnector::save(&path, &mut df).unwrap();

        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.column("date").unwrap().dtype(), &DataType::Date);

        let panel = load_panel(&path, "symbol", "date", None).unwrap();
        assert_eq!(panel.height(), 3);
        assert_eq!(panel.unique_dates_desc(), vec![day.succ_opt().unwrap(), day]);
    }

    #[test]
    fn test_minimum_dates_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.csv");
        let mut df = df! {
            "symbol" => &["A", "B"],
            "date" => &["2021-01-04", "2021-01-04"],
        }
        .unwrap();
        CsvConnector::save(&path, &mut df).unwrap();

        let result = load_panel(&path, "symbol", "date", Some(5));
        assert!(matches!(result, Err(PanelCvError::DataLoading(_))));
    }
}
