//! Walk-backward cross-validation over (entity, date) panels, and the
//! workflow that refits tuned boosting models on each split to produce
//! out-of-sample return predictions.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod ml;

pub use engines::splitters::{CvConfig, DataSplitter, MultipleTimeSeriesCV, Split};
pub use error::{PanelCvError, Result};
