//! Text → vector encoding.
//!
//! `EmbeddingEncoder` is the seam the retrieval pipeline depends on. The
//! production implementation talks to an OpenAI-compatible embeddings
//! endpoint serving the sentence-transformer model; tests inject fakes.

mod http;

pub use http::{HttpEmbeddingEncoder, HttpEncoderConfig};

use async_trait::async_trait;
use thiserror::Error;

/// A fixed-length embedding vector.
pub type Embedding = Vec<f32>;

#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    /// The encoder refused the input (e.g. empty or over-long text).
    #[error("encoder rejected input: {0}")]
    Rejected(String),
    /// The encoder could not be reached or failed server-side.
    #[error("encoder unavailable: {0}")]
    Unavailable(String),
    #[error("malformed encoder response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait EmbeddingEncoder: Send + Sync {
    /// Dimension of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode a single text. Same text and model version yield the same vector.
    async fn encode(&self, text: &str) -> Result<Embedding, EncoderError>;
}
