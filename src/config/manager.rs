use super::{
    data::DataConfig,
    traits::ConfigSection,
    workflow::WorkflowConfig,
};
use crate::engines::splitters::CvConfig;
use crate::error::{PanelCvError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `PANELCV__CV__N_SPLITS=6`
pub const ENV_PREFIX: &str = "PANELCV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cv: CvConfig,
    pub workflow: WorkflowConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        validate_section(&self.cv)?;
        validate_section(&self.workflow)?;
        validate_section(&self.data)?;
        Ok(())
    }
}

/// Validate one section, naming it in configuration errors
fn validate_section<S: ConfigSection>(section: &S) -> Result<()> {
    section.validate().map_err(|e| match e {
        PanelCvError::Configuration(msg) => {
            PanelCvError::Configuration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML or JSON file, then apply `PANELCV__*` environment overrides
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize().map_err(|e| {
            PanelCvError::Configuration(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        log::info!("Loaded configuration from {}", path.as_ref().display());

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| PanelCvError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| PanelCvError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply a change; it is kept only if the result validates
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Loads read PANELCV__* variables, so tests that load files must not
    // interleave with tests that set them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "panelcv.toml",
            "[cv]\nn_splits = 4\ntrain_period_length = 252\ntest_period_length = 63\nlookahead = 5\n\n[workflow]\ntop_n = 3\n",
        );

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get();

        assert_eq!(config.cv.n_splits, 4);
        assert_eq!(config.cv.lookahead, 5);
        assert_eq!(config.workflow.top_n, 3);
        assert_eq!(config.workflow.lookaheads, vec![1, 5, 21]);
        assert_eq!(config.data.entity_column, "symbol");
    }

    #[test]
    fn test_invalid_file_is_rejected_and_previous_kept() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "bad.toml",
            "[cv]\nn_splits = 0\ntrain_period_length = 10\ntest_period_length = 5\nlookahead = 1\n",
        );

        let manager = ConfigManager::new();
        match manager.load_from_file(&path) {
            Err(PanelCvError::Configuration(msg)) => assert!(msg.starts_with("[cv]"), "{}", msg),
            other => panic!("expected a configuration error, got {:?}", other),
        }
        assert_eq!(manager.get().cv, CvConfig::default());
    }

    #[test]
    fn test_fractional_lengths_are_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let fractional = write_config(
            &dir,
            "fractional.toml",
            "[cv]\nn_splits = 2.6\ntrain_period_length = 10\ntest_period_length = 5\nlookahead = 1\n",
        );
        let whole_float = write_config(
            &dir,
            "whole.toml",
            "[cv]\nn_splits = 3.0\ntrain_period_length = 10\ntest_period_length = 5\nlookahead = 1\n",
        );

        let manager = ConfigManager::new();
        assert!(matches!(
            manager.load_from_file(&fractional),
            Err(PanelCvError::Configuration(_))
        ));
        assert_eq!(manager.get().cv, CvConfig::default());

        manager.load_from_file(&whole_float).unwrap();
        assert_eq!(manager.get().cv.n_splits, 3);
    }

    #[test]
    fn test_environment_overrides_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "panelcv.toml",
            "[cv]\nn_splits = 4\ntrain_period_length = 252\ntest_period_length = 63\nlookahead = 5\n",
        );

        std::env::set_var("PANELCV__CV__N_SPLITS", "7");
        let manager = ConfigManager::new();
        let overridden = manager.load_from_file(&path);

        std::env::set_var("PANELCV__CV__N_SPLITS", "1.5");
        let fractional = ConfigManager::new().load_from_file(&path);
        std::env::remove_var("PANELCV__CV__N_SPLITS");

        overridden.unwrap();
        assert_eq!(manager.get().cv.n_splits, 7);
        assert_eq!(manager.get().cv.train_period_length, 252);
        assert!(matches!(fractional, Err(PanelCvError::Configuration(_))));
    }

    #[test]
    fn test_save_then_load() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let manager = ConfigManager::new();
        manager
            .update(|config| {
                config.workflow.parallel = false;
                config.cv.test_period_length = 63;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(&path).unwrap();
        assert!(!reloaded.get().workflow.parallel);
        assert_eq!(reloaded.get().cv.test_period_length, 63);
    }

    #[test]
    fn test_update_rejects_invalid_change() {
        let manager = ConfigManager::new();
        let result = manager.update(|config| config.workflow.top_n = 0);
        assert!(matches!(result, Err(PanelCvError::Configuration(msg)) if msg.starts_with("[workflow]")));
        assert_eq!(manager.get().workflow.top_n, 10);
    }
}
