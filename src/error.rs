use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a command before or around a run.
///
/// Failures of individual steps are not errors at this level; they are
/// recorded as [`crate::testing::Failure`] in the run report.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file `{}`: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema `{name}`: {message}")]
    Schema { name: String, message: String },

    #[error("Invalid scenario plan: {0}")]
    Plan(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("History database error: {0}")]
    History(#[from] rusqlite::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SuiteError>;
