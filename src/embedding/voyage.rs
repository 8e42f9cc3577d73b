//! Voyage AI cloud embedding backend.
//!
//! Calls `POST https://api.voyageai.com/v1/embeddings` with Bearer
//! authentication. The default model is `voyage-3`, pinned to 1024
//! dimensions via `output_dimension`. Requests are paged at 128 inputs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingSettings;
use crate::error::EmbeddingError;

pub const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1/embeddings";

const DIMENSIONS: usize = 1024;
const MAX_BATCH_SIZE: usize = 128;

#[derive(Debug)]
pub struct VoyageProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
    model: &'a str,
    output_dimension: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

impl VoyageProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let api_key =
            settings
                .voyage
                .api_key
                .clone()
                .ok_or_else(|| EmbeddingError::Configuration {
                    provider: "voyage",
                    detail: "VOYAGE_API_KEY is required".to_string(),
                })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Configuration {
                provider: "voyage",
                detail: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: settings.voyage.model.clone(),
            api_url: settings
                .voyage
                .api_url
                .clone()
                .unwrap_or_else(|| VOYAGE_API_URL.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageProvider {
    fn name(&self) -> &'static str {
        "voyage"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                input: texts,
                model: &self.model,
                output_dimension: DIMENSIONS,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Connection {
                provider: "voyage",
                target: self.api_url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(EmbeddingError::Auth {
                    provider: "voyage",
                    credential: "VOYAGE_API_KEY",
                });
            }
            if status.as_u16() == 429 {
                return Err(EmbeddingError::RateLimited { provider: "voyage" });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                provider: "voyage",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::Protocol {
                    provider: "voyage",
                    detail: format!("invalid response body: {}", e),
                })?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::Protocol {
                provider: "voyage",
                detail: format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            });
        }

        // The API may return items out of order; restore input order.
        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}
