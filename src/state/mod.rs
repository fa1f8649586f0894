use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{IndexBackend, Settings};
use crate::embedding::{EmbeddingEncoder, HttpEmbeddingEncoder};
use crate::index::{
    IndexDescription, IndexProvisioner, MemoryIndex, PineconeClient, VectorIndexClient,
};
use crate::retrieval::RetrievalOrchestrator;

pub mod error;

use error::InitializationError;

const DIMENSION_PROBE_TEXT: &str = "dimension probe";

/// Application state shared across all routes.
///
/// Everything in here is established once at startup and read-only
/// afterwards.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<RetrievalOrchestrator>,
    pub index: IndexDescription,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds production clients from settings, then defers to `from_parts`.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let index: Arc<dyn VectorIndexClient> = match settings.index.backend {
            IndexBackend::Pinecone => Arc::new(
                PineconeClient::new(settings.index.pinecone_config()?)
                    .map_err(InitializationError::IndexClient)?,
            ),
            IndexBackend::Memory => {
                tracing::warn!("Using in-memory index; it starts empty");
                Arc::new(MemoryIndex::new())
            }
        };

        let encoder = HttpEmbeddingEncoder::new(
            settings.embedding.encoder_config(settings.index.dimension),
        )
        .map_err(InitializationError::Encoder)?;
        tracing::info!(
            "Embedding model '{}' at {}",
            encoder.model(),
            settings.embedding.base_url
        );

        if settings.embedding.verify_dimension {
            verify_encoder_dimension(&encoder, settings.index.dimension).await?;
        }

        Self::from_parts(settings, Arc::new(encoder), index).await
    }

    /// Initializes the state from already-built components.
    ///
    /// 1. Checks the encoder dimension against the index configuration
    /// 2. Provisions the index (fatal on failure)
    /// 3. Builds the retrieval orchestrator
    pub async fn from_parts(
        settings: Settings,
        encoder: Arc<dyn EmbeddingEncoder>,
        index: Arc<dyn VectorIndexClient>,
    ) -> Result<Arc<Self>, InitializationError> {
        let spec = settings.index.spec();

        if encoder.dimension() != spec.dimension {
            return Err(InitializationError::DimensionMismatch {
                configured: spec.dimension,
                actual: encoder.dimension(),
            });
        }

        let description = IndexProvisioner::new(index.clone(), spec.clone())
            .provision()
            .await?;

        let orchestrator = RetrievalOrchestrator::new(encoder, index, spec.name, spec.dimension)
            .with_top_k(settings.retrieval.top_k);

        Ok(Arc::new(AppState {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            index: description,
            started_at: Utc::now(),
        }))
    }
}

async fn verify_encoder_dimension(
    encoder: &dyn EmbeddingEncoder,
    configured: usize,
) -> Result<(), InitializationError> {
    let probe = encoder
        .encode(DIMENSION_PROBE_TEXT)
        .await
        .map_err(InitializationError::Encoder)?;

    if probe.len() != configured {
        return Err(InitializationError::DimensionMismatch {
            configured,
            actual: probe.len(),
        });
    }
    Ok(())
}
