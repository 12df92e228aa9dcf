mod csv;
mod types;
mod validator;

pub use csv::{load_frame, load_panel, CsvConnector, ParquetConnector};
pub use types::{DatasetMetadata, KeyColumn};
pub use validator::DataValidator;
