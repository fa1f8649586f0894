//! Pinecone REST client.
//!
//! Control plane (`/indexes`) for lifecycle, data plane (`{host}/query`) for
//! search. The data-plane host of each index is discovered once and cached.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{IndexDescription, IndexError, IndexSpec, MatchResult, Metric, VectorIndexClient};

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_API_VERSION: &str = "2024-07";

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub control_plane_url: String,
    pub api_version: String,
    /// Pinned data-plane host; skips discovery through `describe_index`.
    pub host: Option<String>,
    pub namespace: String,
    pub timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub ready_poll_interval_ms: u64,
}

impl PineconeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            host: None,
            namespace: String::new(),
            timeout_secs: 30,
            ready_timeout_secs: 300,
            ready_poll_interval_ms: 2_000,
        }
    }
}

pub struct PineconeClient {
    config: PineconeConfig,
    client: Client,
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct IndexModel {
    name: String,
    #[serde(default)]
    dimension: usize,
    metric: Metric,
    host: Option<String>,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Deserialize, Default)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeClient {
    pub fn new(config: PineconeConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;

        let control_plane_url = config.control_plane_url.trim_end_matches('/').to_string();
        let host = config.host.as_deref().map(normalize_host);
        let config = PineconeConfig {
            control_plane_url,
            host,
            ..config
        };

        Ok(Self {
            config,
            client,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn with_headers(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", &self.config.api_version)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        let url = format!("{}/indexes", self.config.control_plane_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric.as_str(),
            "spec": {
                "serverless": {
                    "cloud": spec.region.cloud,
                    "region": spec.region.region,
                }
            }
        });

        let res = self
            .with_headers(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        match res.status() {
            status if status.is_success() => {
                tracing::info!(
                    "Created index '{}' (dimension={}, metric={}, {}/{})",
                    spec.name,
                    spec.dimension,
                    spec.metric,
                    spec.region.cloud,
                    spec.region.region
                );
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::info!("Index '{}' was created concurrently", spec.name);
                Ok(())
            }
            _ => Err(status_error(res, &spec.name).await),
        }
    }

    async fn wait_until_ready(&self, name: &str) -> Result<(), IndexError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.ready_timeout_secs);
        let interval = Duration::from_millis(self.config.ready_poll_interval_ms);

        loop {
            if let Some(desc) = self.describe_index(name).await? {
                if desc.ready {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(IndexError::Unavailable(format!(
                    "index '{}' not ready after {}s",
                    name, self.config.ready_timeout_secs
                )));
            }
            tracing::debug!("Waiting for index '{}' to become ready", name);
            tokio::time::sleep(interval).await;
        }
    }

    async fn resolve_host(&self, name: &str) -> Result<String, IndexError> {
        if let Some(host) = &self.config.host {
            return Ok(host.clone());
        }
        if let Some(host) = self.cached_host(name) {
            return Ok(host);
        }

        let desc = self
            .describe_index(name)
            .await?
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        desc.host
            .ok_or_else(|| IndexError::Unavailable(format!("index '{}' has no host yet", name)))
    }

    fn index_url(&self, name: &str) -> String {
        format!(
            "{}/indexes/{}",
            self.config.control_plane_url,
            urlencoding::encode(name)
        )
    }

    fn cached_host(&self, name: &str) -> Option<String> {
        self.hosts.read().ok().and_then(|h| h.get(name).cloned())
    }

    fn cache_host(&self, name: &str, host: &str) {
        if let Ok(mut hosts) = self.hosts.write() {
            hosts.insert(name.to_string(), host.to_string());
        }
    }
}

#[async_trait]
impl VectorIndexClient for PineconeClient {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        match self.describe_index(&spec.name).await? {
            Some(desc) if desc.ready => {
                tracing::info!("Index '{}' already exists", spec.name);
                return Ok(());
            }
            Some(_) => {
                tracing::info!("Index '{}' exists but is still initializing", spec.name);
                return self.wait_until_ready(&spec.name).await;
            }
            None => {}
        }

        self.create_index(spec).await?;
        self.wait_until_ready(&spec.name).await
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>, IndexError> {
        let url = self.index_url(name);
        let res = self
            .with_headers(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(status_error(res, name).await);
        }

        let model: IndexModel = res
            .json()
            .await
            .map_err(|e| IndexError::Unavailable(format!("invalid describe response: {}", e)))?;

        let host = model.host.as_deref().map(normalize_host);
        if let Some(host) = &host {
            self.cache_host(name, host);
        }

        Ok(Some(IndexDescription {
            name: model.name,
            dimension: model.dimension,
            metric: model.metric,
            host,
            ready: model.status.ready,
        }))
    }

    async fn search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<MatchResult>, IndexError> {
        let host = self.resolve_host(index_name).await?;
        let url = format!("{}/query", host);

        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": include_metadata,
            "includeValues": false,
            "namespace": self.config.namespace,
        });

        let res = self
            .with_headers(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if res.status() == StatusCode::BAD_REQUEST {
            let text = res.text().await.unwrap_or_default();
            return Err(match parse_expected_dimension(&text) {
                Some(expected) => IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                },
                None => IndexError::Rejected(text),
            });
        }
        if !res.status().is_success() {
            return Err(status_error(res, index_name).await);
        }

        let payload: QueryResponse = res
            .json()
            .await
            .map_err(|e| IndexError::Unavailable(format!("invalid query response: {}", e)))?;

        Ok(payload
            .matches
            .into_iter()
            .map(|m| MatchResult {
                record_id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

fn transport_error(err: reqwest::Error) -> IndexError {
    IndexError::Unavailable(err.to_string())
}

async fn status_error(res: Response, name: &str) -> IndexError {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        IndexError::NotFound(name.to_string())
    } else if status.is_client_error() {
        IndexError::Rejected(format!("{}: {}", status, text))
    } else {
        IndexError::Unavailable(format!("{}: {}", status, text))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

const INDEX_DIMENSION_PHRASE: &str = "dimension of the index";

/// Pull the index dimension out of a "Vector dimension N does not match the
/// dimension of the index M" error body.
fn parse_expected_dimension(body: &str) -> Option<usize> {
    let lower = body.to_lowercase();
    let start = lower.find(INDEX_DIMENSION_PHRASE)? + INDEX_DIMENSION_PHRASE.len();
    let digits: String = lower[start..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
