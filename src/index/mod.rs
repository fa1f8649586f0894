//! Similarity index access.
//!
//! This module provides:
//! - `VectorIndexClient` trait over remote/in-process similarity indexes
//! - `PineconeClient` for the managed Pinecone service
//! - `MemoryIndex` for in-process use (local runs and tests)
//! - `IndexProvisioner` for one-time, idempotent index setup

mod memory;
mod pinecone;
pub mod provisioner;

pub use memory::{IndexRecord, MemoryIndex};
pub use pinecone::{
    PineconeClient, PineconeConfig, DEFAULT_API_VERSION, DEFAULT_CONTROL_PLANE_URL,
};
pub use provisioner::IndexProvisioner;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Similarity metric an index is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    #[serde(alias = "dot", alias = "dot_product")]
    DotProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment location of a serverless index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub cloud: String,
    pub region: String,
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self {
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Desired shape of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub region: RegionSpec,
}

/// Shape of an index as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    /// Data-plane host, when the backend exposes one.
    pub host: Option<String>,
    pub ready: bool,
}

/// One hit of a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub record_id: String,
    /// Similarity score (higher is more similar).
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl MatchResult {
    /// Read a string metadata field.
    ///
    /// An empty string is a present value; a missing key or a non-string
    /// value is absent.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// Network failure or server-side error.
    #[error("index service unavailable: {0}")]
    Unavailable(String),
    #[error("index not found: {0}")]
    NotFound(String),
    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The service refused a control-plane request (bad spec, quota, auth).
    #[error("index request rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Create the index if it does not exist yet; no-op otherwise. Returns
    /// once the index is ready to serve queries.
    ///
    /// Must be safe on every process start. Concurrent creation races are
    /// resolved by the service: an "already exists" answer is success.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), IndexError>;

    /// Describe an index, or `None` if it does not exist.
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>, IndexError>;

    /// Nearest-neighbour search. Returns at most `top_k` matches, best first.
    /// An empty index yields an empty vector.
    async fn search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<MatchResult>, IndexError>;
}
