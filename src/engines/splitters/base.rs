use super::multiple::Splits;
use super::types::CvConfig;
use crate::data::Panel;
use crate::error::Result;
use chrono::NaiveDate;

pub trait DataSplitter: Send + Sync {
    /// Split rows into train/test windows given the date of every row
    fn split(&self, row_dates: &[NaiveDate]) -> Result<Splits>;

    /// Get splitter configuration
    fn config(&self) -> &CvConfig;

    fn split_panel(&self, panel: &Panel) -> Result<Splits> {
        self.split(panel.row_dates())
    }
}
