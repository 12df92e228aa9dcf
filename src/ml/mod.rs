pub mod models;
pub mod tuning;
