use super::params::{ModelFamily, ModelParams};
use crate::error::Result;
use polars::prelude::*;

/// A boosting library wrapped behind a single fit call.
///
/// Implementations own the translation from `DataFrame` features and
/// `ModelParams` to whatever the library expects.
pub trait Regressor: Send + Sync {
    fn family(&self) -> ModelFamily;

    fn fit(
        &self,
        features: &DataFrame,
        labels: &[f64],
        params: &ModelParams,
    ) -> Result<Box<dyn Predictor>>;
}

/// A fitted model.
pub trait Predictor {
    /// One prediction per input row, in row order
    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>>;

    /// Feature names as the fitted library reports them
    fn feature_names(&self) -> Vec<String>;

    /// Importance per feature, aligned with `feature_names`
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }
}
