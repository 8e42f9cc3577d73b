//! Local-inference embedding backend via Ollama.
//!
//! Calls `POST {url}/api/embed` on a running Ollama instance (default
//! `http://localhost:11434`). No API key, no cloud round-trip; the default
//! model is `mxbai-embed-large` (1024-dim).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingSettings;
use crate::error::EmbeddingError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const DIMENSIONS: usize = 1024;
const MAX_BATCH_SIZE: usize = 64;

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Configuration {
                provider: "ollama",
                detail: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: settings
                .ollama
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: settings.ollama.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));

        let response = self
            .client
            .post(&endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Connection {
                provider: "ollama",
                target: self.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                provider: "ollama",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::Protocol {
                    provider: "ollama",
                    detail: format!("invalid response body: {}", e),
                })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Protocol {
                provider: "ollama",
                detail: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed.embeddings)
    }
}
