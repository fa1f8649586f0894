//! In-process similarity index.
//!
//! Brute-force scan over stored records. Serves the same contract as the
//! remote client so the pipeline can run without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{IndexDescription, IndexError, IndexSpec, MatchResult, VectorIndexClient};
use crate::vector_math::similarity;

/// A stored vector with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

struct Collection {
    spec: IndexSpec,
    records: Vec<IndexRecord>,
}

#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
    creations: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexes actually created over the lifetime of this client.
    pub fn creation_count(&self) -> usize {
        self.creations.load(AtomicOrdering::SeqCst)
    }

    /// Insert or replace records by id.
    pub fn upsert(&self, index_name: &str, records: Vec<IndexRecord>) -> Result<(), IndexError> {
        let mut collections = self.collections.write().map_err(lock_poisoned)?;
        let collection = collections
            .get_mut(index_name)
            .ok_or_else(|| IndexError::NotFound(index_name.to_string()))?;

        for record in records {
            if record.values.len() != collection.spec.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: collection.spec.dimension,
                    actual: record.values.len(),
                });
            }
            match collection.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => collection.records.push(record),
            }
        }
        Ok(())
    }

    /// Record count of an index.
    pub fn count(&self, index_name: &str) -> Result<usize, IndexError> {
        let collections = self.collections.read().map_err(lock_poisoned)?;
        collections
            .get(index_name)
            .map(|c| c.records.len())
            .ok_or_else(|| IndexError::NotFound(index_name.to_string()))
    }
}

#[async_trait]
impl VectorIndexClient for MemoryIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        let mut collections = self.collections.write().map_err(lock_poisoned)?;
        if collections.contains_key(&spec.name) {
            tracing::debug!("Index '{}' already exists", spec.name);
            return Ok(());
        }

        collections.insert(
            spec.name.clone(),
            Collection {
                spec: spec.clone(),
                records: Vec::new(),
            },
        );
        self.creations.fetch_add(1, AtomicOrdering::SeqCst);
        tracing::info!(
            "Created in-memory index '{}' (dimension={}, metric={})",
            spec.name,
            spec.dimension,
            spec.metric
        );
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>, IndexError> {
        let collections = self.collections.read().map_err(lock_poisoned)?;
        Ok(collections.get(name).map(|c| IndexDescription {
            name: c.spec.name.clone(),
            dimension: c.spec.dimension,
            metric: c.spec.metric,
            host: None,
            ready: true,
        }))
    }

    async fn search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<MatchResult>, IndexError> {
        let collections = self.collections.read().map_err(lock_poisoned)?;
        let collection = collections
            .get(index_name)
            .ok_or_else(|| IndexError::NotFound(index_name.to_string()))?;

        if vector.len() != collection.spec.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: collection.spec.dimension,
                actual: vector.len(),
            });
        }

        let mut matches = Vec::with_capacity(collection.records.len());
        for record in &collection.records {
            let score = similarity(collection.spec.metric, vector, &record.values)?;
            matches.push(MatchResult {
                record_id: record.id.clone(),
                score,
                metadata: if include_metadata {
                    record.metadata.clone()
                } else {
                    Map::new()
                },
            });
        }

        // NaN scores (from NaN components) rank last.
        matches.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
        matches.truncate(top_k);
        Ok(matches)
    }
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

fn lock_poisoned<T>(_: T) -> IndexError {
    IndexError::Unavailable("memory index lock poisoned".to_string())
}
