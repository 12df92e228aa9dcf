use crate::error::{PanelCvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Boosting library a parameter set targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    LightGbm,
    CatBoost,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LightGbm => "lightgbm",
            Self::CatBoost => "catboost",
        }
    }

    /// Library defaults every candidate starts from
    fn base_values(&self) -> BTreeMap<String, ParamValue> {
        let pairs: Vec<(&str, ParamValue)> = match self {
            Self::LightGbm => vec![
                ("boosting", ParamValue::Text("gbdt".to_string())),
                ("objective", ParamValue::Text("regression".to_string())),
                ("verbose", ParamValue::Int(-1)),
            ],
            Self::CatBoost => vec![
                ("loss_function", ParamValue::Text("RMSE".to_string())),
                ("verbose", ParamValue::Bool(false)),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = PanelCvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lightgbm" | "lgb" => Ok(Self::LightGbm),
            "catboost" | "cb" => Ok(Self::CatBoost),
            other => Err(PanelCvError::Configuration(format!(
                "Unknown model family: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Hyperparameters for one fit. Values are never mutated in place: merging
/// overrides yields a new `ModelParams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    family: ModelFamily,
    values: BTreeMap<String, ParamValue>,
    num_boost_round: usize,
}

impl ModelParams {
    pub fn base(family: ModelFamily, num_boost_round: usize) -> Self {
        Self {
            family,
            values: family.base_values(),
            num_boost_round,
        }
    }

    pub fn with_overrides<I, K>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: Into<String>,
    {
        let mut values = self.values.clone();
        values.extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
        Self {
            family: self.family,
            values,
            num_boost_round: self.num_boost_round,
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn num_boost_round(&self) -> usize {
        self.num_boost_round
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_produce_new_value() {
        let base = ModelParams::base(ModelFamily::LightGbm, 100);
        let tuned = base.with_overrides([
            ("learning_rate", ParamValue::Float(0.05)),
            ("verbose", ParamValue::Int(0)),
        ]);

        assert_eq!(base.get("learning_rate"), None);
        assert_eq!(base.get("verbose"), Some(&ParamValue::Int(-1)));
        assert_eq!(tuned.get("learning_rate"), Some(&ParamValue::Float(0.05)));
        assert_eq!(tuned.get("verbose"), Some(&ParamValue::Int(0)));
        assert_eq!(tuned.num_boost_round(), 100);
    }

    #[test]
    fn test_family_parsing() {
        assert_eq!("LightGBM".parse::<ModelFamily>().unwrap(), ModelFamily::LightGbm);
        assert_eq!("cb".parse::<ModelFamily>().unwrap(), ModelFamily::CatBoost);
        assert!("xgboost".parse::<ModelFamily>().is_err());
    }
}
