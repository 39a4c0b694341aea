use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a HH:MM clock time, got `{value}`")]
    InvalidReviewTime { field: &'static str, value: String },

    #[error("default repeat `{0}` is not a recognised repeat value")]
    InvalidDefaultRepeat(String),

    #[error("custom interval button {index} must have a positive amount")]
    NonPositiveInterval { index: usize },

    #[error("custom interval button {index} must not exceed {max_days} days")]
    IntervalTooLong { index: usize, max_days: i64 },

    #[error("custom interval button {index} must be longer than button {previous}")]
    IntervalOrder { index: usize, previous: usize },

    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}
