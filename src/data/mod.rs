pub mod connectors;
pub mod encoding;
pub mod panel;
pub mod store;

pub use connectors::{load_panel, CsvConnector, DatasetMetadata, ParquetConnector};
pub use encoding::encode_categoricals;
pub use panel::{column_values, Panel};
pub use store::PredictionStore;
