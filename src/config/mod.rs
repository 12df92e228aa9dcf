pub mod traits;
pub mod cv;
pub mod data;
pub mod workflow;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use data::DataConfig;
pub use workflow::WorkflowConfig;
pub use crate::engines::splitters::CvConfig;
