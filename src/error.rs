use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelCvError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient history: {required} distinct dates required, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Empty {window} window in split {split}")]
    EmptyWindow { split: usize, window: WindowKind },

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model fit error: {0}")]
    ModelFit(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

/// Which side of a split a window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WindowKind {
    Train,
    Test,
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

pub type Result<T> = std::result::Result<T, PanelCvError>;
