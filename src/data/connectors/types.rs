use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Key columns every panel must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyColumn {
    Entity,
    Date,
}

impl KeyColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "symbol",
            Self::Date => "date",
        }
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Entity => vec!["symbol", "Symbol", "ticker", "Ticker", "entity", "asset"],
            Self::Date => vec!["date", "Date", "datetime", "DateTime", "timestamp"],
        }
    }
}

/// Metadata about a loaded panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub num_columns: usize,
    pub columns: Vec<String>,
    pub entity_column: String,
    pub date_column: String,
    pub num_entities: usize,
    pub num_dates: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}
