//! One-time index setup, run before the server accepts traffic.
//!
//! Creation relies on the index service being idempotent under concurrent
//! starts (an "already exists" answer counts as success); there is no
//! client-side locking.

use std::sync::Arc;

use thiserror::Error;

use super::{IndexDescription, IndexError, IndexSpec, Metric, VectorIndexClient};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to provision index: {0}")]
    Index(#[from] IndexError),

    #[error("index '{0}' does not exist after provisioning")]
    Missing(String),

    #[error("index '{0}' is not ready after provisioning")]
    NotReady(String),

    #[error("index '{name}' has dimension {actual}, configured dimension is {configured}")]
    DimensionMismatch {
        name: String,
        configured: usize,
        actual: usize,
    },

    #[error("index '{name}' uses metric {actual}, configured metric is {configured}")]
    MetricMismatch {
        name: String,
        configured: Metric,
        actual: Metric,
    },
}

pub struct IndexProvisioner {
    client: Arc<dyn VectorIndexClient>,
    spec: IndexSpec,
}

impl IndexProvisioner {
    pub fn new(client: Arc<dyn VectorIndexClient>, spec: IndexSpec) -> Self {
        Self { client, spec }
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Ensure the index exists, then verify its shape matches the spec.
    pub async fn provision(&self) -> Result<IndexDescription, ProvisionError> {
        tracing::info!(
            "Provisioning index '{}' (dimension={}, metric={}, {}/{})",
            self.spec.name,
            self.spec.dimension,
            self.spec.metric,
            self.spec.region.cloud,
            self.spec.region.region
        );

        self.client.ensure_index(&self.spec).await?;

        let desc = self
            .client
            .describe_index(&self.spec.name)
            .await?
            .ok_or_else(|| ProvisionError::Missing(self.spec.name.clone()))?;

        if !desc.ready {
            return Err(ProvisionError::NotReady(desc.name));
        }

        if desc.dimension != self.spec.dimension {
            return Err(ProvisionError::DimensionMismatch {
                name: desc.name,
                configured: self.spec.dimension,
                actual: desc.dimension,
            });
        }
        if desc.metric != self.spec.metric {
            return Err(ProvisionError::MetricMismatch {
                name: desc.name,
                configured: self.spec.metric,
                actual: desc.metric,
            });
        }

        tracing::info!("Index '{}' ready", desc.name);
        Ok(desc)
    }
}
