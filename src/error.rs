//! Error types for freshcheck.

use std::path::PathBuf;

use thiserror::Error;

/// Checker error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required configuration: {0} (set it in the config file, the environment or on the command line)")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Failed to fetch latest commit for {reference}: {reason}")]
    Fetch { reference: String, reason: String },
}

impl Error {
    /// Create a fetch error for a branch reference.
    pub fn fetch(reference: impl ToString, reason: impl Into<String>) -> Self {
        Self::Fetch {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any network call was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig(_)
                | Self::InvalidConfig(_)
                | Self::ConfigNotFound(_)
                | Self::ConfigParse(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}
