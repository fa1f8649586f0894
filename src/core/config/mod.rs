pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{IndexBackend, LogRotation, LoggingSettings, Settings};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config at '{path}': {message}")]
    Invalid { path: String, message: String },

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Failed to deserialize settings: {0}")]
    Deserialize(String),
}

impl ConfigError {
    pub fn invalid(path: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
