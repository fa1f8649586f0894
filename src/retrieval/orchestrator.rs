use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::{Query, RetrievalError, RetrievalResponse};
use crate::embedding::EmbeddingEncoder;
use crate::index::{IndexError, MatchResult, VectorIndexClient};

pub const DEFAULT_TOP_K: usize = 5;
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

const TEXT_FIELD: &str = "text";
const URL_FIELD: &str = "url";

/// Stateless query → context pipeline.
///
/// Holds only shared, read-only handles, so one instance serves any number
/// of concurrent requests.
#[derive(Clone)]
pub struct RetrievalOrchestrator {
    encoder: Arc<dyn EmbeddingEncoder>,
    index: Arc<dyn VectorIndexClient>,
    index_name: String,
    dimension: usize,
    top_k: usize,
}

impl RetrievalOrchestrator {
    pub fn new(
        encoder: Arc<dyn EmbeddingEncoder>,
        index: Arc<dyn VectorIndexClient>,
        index_name: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            encoder,
            index,
            index_name: index_name.into(),
            dimension,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &Query) -> Result<RetrievalResponse, RetrievalError> {
        let span = tracing::info_span!("retrieve", request_id = %Uuid::new_v4());
        self.retrieve_inner(query).instrument(span).await
    }

    async fn retrieve_inner(&self, query: &Query) -> Result<RetrievalResponse, RetrievalError> {
        let embedding = self.encoder.encode(&query.text).await.map_err(|e| {
            tracing::warn!("Query encoding failed: {}", e);
            RetrievalError::EncodingFailed(e)
        })?;

        if embedding.len() != self.dimension {
            tracing::error!(
                "Encoder produced {} components for index '{}' of dimension {}",
                embedding.len(),
                self.index_name,
                self.dimension
            );
            return Err(RetrievalError::SearchFailed(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            }));
        }

        let matches = self
            .index
            .search(&self.index_name, &embedding, self.top_k, true)
            .await
            .map_err(|e| {
                match &e {
                    IndexError::DimensionMismatch { .. } => {
                        tracing::error!("Index rejected query vector: {}", e)
                    }
                    _ => tracing::warn!("Index search failed: {}", e),
                }
                RetrievalError::SearchFailed(e)
            })?;

        let response = assemble_response(&matches);
        tracing::info!(
            "Retrieved {} matches ({} sources)",
            response.matches_found,
            response.sources.len()
        );
        Ok(response)
    }
}

/// Build the response from raw matches, preserving their order.
///
/// `text` and `url` are read independently: a match may feed the context,
/// the sources, both or neither, and always counts toward `matches_found`.
pub fn assemble_response(matches: &[MatchResult]) -> RetrievalResponse {
    let mut context_parts = Vec::new();
    let mut sources = Vec::new();

    for m in matches {
        if let Some(text) = m.metadata_str(TEXT_FIELD) {
            context_parts.push(text);
        }
        if let Some(url) = m.metadata_str(URL_FIELD) {
            sources.push(url.to_string());
        }
    }

    RetrievalResponse {
        context: context_parts.join(CONTEXT_SEPARATOR),
        sources,
        matches_found: matches.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::embedding::{Embedding, EncoderError};
    use crate::index::{IndexDescription, IndexSpec};

    struct FakeEncoder {
        result: Result<Embedding, EncoderError>,
    }

    #[async_trait]
    impl EmbeddingEncoder for FakeEncoder {
        fn dimension(&self) -> usize {
            3
        }

        async fn encode(&self, _text: &str) -> Result<Embedding, EncoderError> {
            self.result.clone()
        }
    }

    struct FakeIndex {
        result: Result<Vec<MatchResult>, IndexError>,
        searches: AtomicUsize,
        last_top_k: AtomicUsize,
    }

    impl FakeIndex {
        fn new(result: Result<Vec<MatchResult>, IndexError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                searches: AtomicUsize::new(0),
                last_top_k: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VectorIndexClient for FakeIndex {
        async fn ensure_index(&self, _spec: &IndexSpec) -> Result<(), IndexError> {
            Ok(())
        }

        async fn describe_index(
            &self,
            _name: &str,
        ) -> Result<Option<IndexDescription>, IndexError> {
            Ok(None)
        }

        async fn search(
            &self,
            _index_name: &str,
            _vector: &[f32],
            top_k: usize,
            _include_metadata: bool,
        ) -> Result<Vec<MatchResult>, IndexError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.last_top_k.store(top_k, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn hit(id: &str, metadata: Value) -> MatchResult {
        MatchResult {
            record_id: id.to_string(),
            score: 0.5,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    fn orchestrator(
        encoded: Result<Embedding, EncoderError>,
        index: Arc<FakeIndex>,
    ) -> RetrievalOrchestrator {
        RetrievalOrchestrator::new(
            Arc::new(FakeEncoder { result: encoded }),
            index,
            "kaanoon",
            3,
        )
    }

    #[tokio::test]
    async fn joins_texts_with_separator_in_match_order() {
        let index = FakeIndex::new(Ok(vec![
            hit("1", json!({ "text": "A" })),
            hit("2", json!({ "text": "B" })),
            hit("3", json!({ "text": "C" })),
        ]));
        let response = orchestrator(Ok(vec![0.1, 0.2, 0.3]), index)
            .retrieve(&Query::new("contract law"))
            .await
            .unwrap();

        assert_eq!(response.context, "A\n---\nB\n---\nC");
        assert!(response.sources.is_empty());
        assert_eq!(response.matches_found, 3);
    }

    #[tokio::test]
    async fn partial_metadata_is_skipped_not_padded() {
        let index = FakeIndex::new(Ok(vec![
            hit("1", json!({ "text": "t1" })),
            hit("2", json!({ "url": "u2" })),
            hit("3", json!({ "text": "t3" })),
        ]));
        let response = orchestrator(Ok(vec![0.0; 3]), index)
            .retrieve(&Query::new("bail"))
            .await
            .unwrap();

        assert_eq!(response.context, "t1\n---\nt3");
        assert_eq!(response.sources, vec!["u2".to_string()]);
        assert_eq!(response.matches_found, 3);
    }

    #[tokio::test]
    async fn empty_index_is_success() {
        let index = FakeIndex::new(Ok(vec![]));
        let response = orchestrator(Ok(vec![0.0; 3]), index)
            .retrieve(&Query::new("anything"))
            .await
            .unwrap();

        assert_eq!(response, RetrievalResponse::default());
    }

    #[tokio::test]
    async fn matches_without_fields_still_count() {
        let index = FakeIndex::new(Ok(vec![
            hit("1", json!({ "title": "no text" })),
            hit("2", json!({})),
        ]));
        let response = orchestrator(Ok(vec![0.0; 3]), index)
            .retrieve(&Query::new("x"))
            .await
            .unwrap();

        assert_eq!(response.context, "");
        assert!(response.sources.is_empty());
        assert_eq!(response.matches_found, 2);
    }

    #[tokio::test]
    async fn encoder_failure_skips_search() {
        let index = FakeIndex::new(Ok(vec![hit("1", json!({ "text": "A" }))]));
        let err = orchestrator(
            Err(EncoderError::Rejected("empty".into())),
            index.clone(),
        )
        .retrieve(&Query::new(""))
        .await
        .unwrap_err();

        assert!(matches!(err, RetrievalError::EncodingFailed(_)));
        assert_eq!(index.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        let index = FakeIndex::new(Err(IndexError::Unavailable("timeout".into())));
        let err = orchestrator(Ok(vec![0.0; 3]), index)
            .retrieve(&Query::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RetrievalError::SearchFailed(IndexError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn wrong_length_embedding_never_reaches_the_index() {
        let index = FakeIndex::new(Ok(vec![]));
        let err = orchestrator(Ok(vec![0.0; 2]), index.clone())
            .retrieve(&Query::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RetrievalError::SearchFailed(IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(index.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn uses_configured_top_k() {
        let index = FakeIndex::new(Ok(vec![]));
        let default = orchestrator(Ok(vec![0.0; 3]), index.clone());
        default.retrieve(&Query::new("x")).await.unwrap();
        assert_eq!(index.last_top_k.load(Ordering::SeqCst), DEFAULT_TOP_K);

        default.with_top_k(8).retrieve(&Query::new("x")).await.unwrap();
        assert_eq!(index.last_top_k.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn empty_strings_count_as_present() {
        let response = assemble_response(&[
            hit("1", json!({ "text": "", "url": "" })),
            hit("2", json!({ "text": "B" })),
        ]);

        assert_eq!(response.context, "\n---\nB");
        assert_eq!(response.sources, vec![String::new()]);
    }

    #[test]
    fn non_string_fields_are_absent() {
        let response = assemble_response(&[hit("1", json!({ "text": 7, "url": null }))]);

        assert_eq!(response.context, "");
        assert!(response.sources.is_empty());
        assert_eq!(response.matches_found, 1);
    }

    #[test]
    fn output_never_exceeds_match_count() {
        let matches: Vec<MatchResult> = (0..5)
            .map(|i| {
                let metadata = match i % 3 {
                    0 => json!({ "text": format!("t{}", i), "url": format!("u{}", i) }),
                    1 => json!({ "url": format!("u{}", i) }),
                    _ => json!({}),
                };
                hit(&i.to_string(), metadata)
            })
            .collect();

        let response = assemble_response(&matches);

        assert_eq!(response.matches_found, 5);
        assert!(response.sources.len() <= response.matches_found);
        assert!(response.context.split(CONTEXT_SEPARATOR).count() <= response.matches_found);
        assert_eq!(response.sources, vec!["u0", "u1", "u3", "u4"]);
        assert_eq!(response.context, "t0\n---\nt3");
    }
}
