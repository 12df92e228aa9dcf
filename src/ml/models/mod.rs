pub mod model;
pub mod params;

pub use model::{Predictor, Regressor};
pub use params::{ModelFamily, ModelParams, ParamValue};
