//! Retrieval pipeline.
//!
//! `RetrievalOrchestrator` turns a query into a context string plus the
//! provenance of the fragments it was built from:
//! 1. Encode the query text
//! 2. Search the similarity index
//! 3. Assemble `text` metadata into context and `url` metadata into sources

mod orchestrator;

pub use orchestrator::{assemble_response, RetrievalOrchestrator, CONTEXT_SEPARATOR, DEFAULT_TOP_K};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::EncoderError;
use crate::index::IndexError;

/// A retrieval request. The text is passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "query")]
    pub text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub context: String,
    pub sources: Vec<String>,
    /// Matches the index returned, with or without usable metadata.
    pub matches_found: usize,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("encoding failed: {0}")]
    EncodingFailed(#[source] EncoderError),

    #[error("search failed: {0}")]
    SearchFailed(#[source] IndexError),
}
