use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Embedding, EmbeddingEncoder, EncoderError};

#[derive(Debug, Clone)]
pub struct HttpEncoderConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Encoder backed by an OpenAI-compatible `/v1/embeddings` endpoint
/// (text-embeddings-inference, LM Studio, Ollama, ...).
#[derive(Clone)]
pub struct HttpEmbeddingEncoder {
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbeddingEncoder {
    pub fn new(config: HttpEncoderConfig) -> Result<Self, EncoderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EncoderError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            dimension: config.dimension,
            api_key: config.api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingEncoder for HttpEmbeddingEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Embedding, EncoderError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| EncoderError::Unavailable(e.to_string()))?;

        let status = res.status();
        if status.is_client_error() {
            let text = res.text().await.unwrap_or_default();
            return Err(EncoderError::Rejected(format!("{}: {}", status, text)));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(EncoderError::Unavailable(format!("{}: {}", status, text)));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| EncoderError::MalformedResponse(e.to_string()))?;

        let values = payload["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| {
                EncoderError::MalformedResponse("missing data[0].embedding".to_string())
            })?;

        values
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EncoderError::MalformedResponse(format!("non-numeric component: {}", v))
                })
            })
            .collect()
    }
}
