use thiserror::Error;

use crate::core::config::ConfigError;
use crate::embedding::EncoderError;
use crate::index::provisioner::ProvisionError;
use crate::index::IndexError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize index client: {0}")]
    IndexClient(#[source] IndexError),

    #[error("Failed to initialize embedding encoder: {0}")]
    Encoder(#[source] EncoderError),

    #[error("Failed to provision index: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Encoder produces {actual}-dimensional vectors, index is configured for {configured}")]
    DimensionMismatch { configured: usize, actual: usize },
}
