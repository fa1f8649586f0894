//! Typed view of the merged configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::validate_config;
use super::ConfigError;
use crate::embedding::HttpEncoderConfig;
use crate::index::{
    IndexSpec, Metric, PineconeConfig, RegionSpec, DEFAULT_API_VERSION, DEFAULT_CONTROL_PLANE_URL,
};
use crate::retrieval::DEFAULT_TOP_K;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    /// In-process index; starts empty.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    pub api_key: Option<String>,
    pub control_plane_url: String,
    pub api_version: String,
    pub host: Option<String>,
    pub namespace: String,
    pub timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub ready_poll_interval_ms: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        let region = RegionSpec::default();
        Self {
            backend: IndexBackend::Pinecone,
            name: "kaanoon".to_string(),
            dimension: 768,
            metric: Metric::Cosine,
            cloud: region.cloud,
            region: region.region,
            api_key: None,
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

impl IndexSettings {
    pub fn spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            region: RegionSpec {
                cloud: self.cloud.clone(),
                region: self.region.clone(),
            },
        }
    }

    pub fn pinecone_config(&self) -> Result<PineconeConfig, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing("index.api_key (PINECONE_API_KEY)".to_string()))?;

        Ok(PineconeConfig {
            api_key: api_key.to_string(),
            control_plane_url: self.control_plane_url.clone(),
            api_version: self.api_version.clone(),
            host: self.host.clone().filter(|h| !h.trim().is_empty()),
            namespace: self.namespace.clone(),
            timeout_secs: self.timeout_secs,
            ready_timeout_secs: self.ready_timeout_secs,
            ready_poll_interval_ms: self.ready_poll_interval_ms,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Encode a probe text at startup and compare its length to the index.
    pub verify_dimension: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            model: "all-mpnet-base-v2".to_string(),
            api_key: None,
            timeout_secs: 30,
            verify_dimension: true,
        }
    }
}

impl EmbeddingSettings {
    /// Encoder config; the encoder dimension always follows the index.
    pub fn encoder_config(&self, dimension: usize) -> HttpEncoderConfig {
        HttpEncoderConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            dimension,
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// File name prefix inside the log directory.
    pub file_name: String,
    pub rotation: LogRotation,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_name: "kaanoon-rag.log".to_string(),
            rotation: LogRotation::Daily,
        }
    }
}

impl Settings {
    /// Validate the raw merged config and deserialize it.
    ///
    /// A Pinecone backend without a credential is rejected here so the
    /// process fails before touching the network.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        validate_config(value)?;
        let settings: Settings = serde_json::from_value(normalize_enums(value))
            .map_err(|e| ConfigError::Deserialize(e.to_string()))?;

        if settings.index.backend == IndexBackend::Pinecone {
            settings.index.pinecone_config()?;
        }
        Ok(settings)
    }
}

/// Enum-valued fields are case-insensitive in the config file.
fn normalize_enums(value: &Value) -> Value {
    let mut value = value.clone();
    for (section, key) in [("index", "backend"), ("index", "metric"), ("logging", "rotation")] {
        let Some(field) = value
            .get_mut(section)
            .and_then(Value::as_object_mut)
            .and_then(|map| map.get_mut(key))
        else {
            continue;
        };
        if let Some(text) = field.as_str() {
            *field = Value::String(text.to_lowercase());
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_reference_deployment() {
        let settings = Settings::from_value(&json!({
            "index": { "api_key": "pk-test" }
        }))
        .unwrap();

        assert_eq!(settings.index.name, "kaanoon");
        assert_eq!(settings.index.dimension, 768);
        assert_eq!(settings.index.metric, Metric::Cosine);
        assert_eq!(settings.index.spec().region, RegionSpec::default());
        assert_eq!(settings.embedding.model, "all-mpnet-base-v2");
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn missing_credential_fails_fast() {
        let err = Settings::from_value(&json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        let err = Settings::from_value(&json!({ "index": { "api_key": "  " } })).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn memory_backend_needs_no_credential() {
        let settings = Settings::from_value(&json!({
            "index": { "backend": "memory", "metric": "DotProduct" }
        }))
        .unwrap();

        assert_eq!(settings.index.backend, IndexBackend::Memory);
        assert_eq!(settings.index.metric, Metric::DotProduct);
    }

    #[test]
    fn pinecone_config_carries_overrides() {
        let settings = Settings::from_value(&json!({
            "index": {
                "api_key": "pk-test",
                "host": "kaanoon-xyz.svc.pinecone.io",
                "namespace": "judgments",
                "ready_timeout_secs": 0
            }
        }))
        .unwrap();

        let config = settings.index.pinecone_config().unwrap();
        assert_eq!(config.api_key, "pk-test");
        assert_eq!(config.host.as_deref(), Some("kaanoon-xyz.svc.pinecone.io"));
        assert_eq!(config.namespace, "judgments");
        assert_eq!(config.ready_timeout_secs, 0);
    }

    #[test]
    fn logging_section_is_typed() {
        let settings = Settings::from_value(&json!({
            "index": { "backend": "memory" },
            "logging": { "level": "kaanoon_rag=debug", "file_name": "rag.log", "rotation": "Hourly" }
        }))
        .unwrap();

        assert_eq!(settings.logging.level, "kaanoon_rag=debug");
        assert_eq!(settings.logging.file_name, "rag.log");
        assert_eq!(settings.logging.rotation, LogRotation::Hourly);
        assert_eq!(Settings::default().logging.rotation, LogRotation::Daily);
    }
}
