pub mod methods;
pub mod metrics;
pub mod splitters;
