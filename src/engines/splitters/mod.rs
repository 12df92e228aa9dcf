pub mod base;
pub mod multiple;
pub mod types;

pub use base::DataSplitter;
pub use multiple::{MultipleTimeSeriesCV, Splits};
pub use types::{CvConfig, DateRange, Split, SplitSummary};
