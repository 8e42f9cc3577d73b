//! OpenAI cloud embedding backend, in two credential modes.
//!
//! Standard mode sends `Authorization: Bearer $OPENAI_API_KEY` to the
//! public embeddings endpoint with the model in the request body. Azure
//! mode sends an `api-key` header to
//! `{endpoint}/openai/deployments/{deployment}/embeddings` where the
//! deployment replaces the body's model field. A complete Azure triplet
//! (endpoint + key + deployment) takes precedence over a bare API key;
//! with neither complete, construction fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingSettings;
use crate::error::EmbeddingError;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/embeddings";

const AZURE_API_VERSION: &str = "2024-02-01";
const DIMENSIONS: usize = 1024;
const MAX_BATCH_SIZE: usize = 2048;

#[derive(Debug)]
enum AuthMode {
    ApiKey { key: String },
    Azure {
        endpoint: String,
        key: String,
        deployment: String,
    },
}

#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    auth: AuthMode,
    model: String,
    api_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
    dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
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

impl OpenAiProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let o = &settings.openai;

        let auth = match (&o.azure_endpoint, &o.azure_key, &o.azure_deployment) {
            (Some(endpoint), Some(key), Some(deployment)) => AuthMode::Azure {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                key: key.clone(),
                deployment: deployment.clone(),
            },
            _ => match &o.api_key {
                Some(key) => AuthMode::ApiKey { key: key.clone() },
                None => {
                    return Err(EmbeddingError::Configuration {
                        provider: "openai",
                        detail: "either OPENAI_API_KEY or AZURE_OPENAI_ENDPOINT + \
                                 AZURE_OPENAI_KEY + AZURE_OPENAI_DEPLOYMENT required"
                            .to_string(),
                    })
                }
            },
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Configuration {
                provider: "openai",
                detail: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            auth,
            model: o.model.clone(),
            api_url: o.api_url.clone().unwrap_or_else(|| OPENAI_API_URL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        match &self.auth {
            AuthMode::Azure {
                endpoint,
                deployment,
                ..
            } => format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                endpoint, deployment, AZURE_API_VERSION
            ),
            AuthMode::ApiKey { .. } => self.api_url.clone(),
        }
    }

    fn rejected_credential(&self) -> &'static str {
        match &self.auth {
            AuthMode::Azure { .. } => "AZURE_OPENAI_KEY",
            AuthMode::ApiKey { .. } => "OPENAI_API_KEY",
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = self.endpoint();

        // Azure routes the model through the deployment in the URL.
        let body = EmbedRequest {
            input: texts,
            dimensions: DIMENSIONS,
            model: match &self.auth {
                AuthMode::Azure { .. } => None,
                AuthMode::ApiKey { .. } => Some(&self.model),
            },
        };

        let request = match &self.auth {
            AuthMode::Azure { key, .. } => self.client.post(&url).header("api-key", key),
            AuthMode::ApiKey { key } => self.client.post(&url).bearer_auth(key),
        };

        let response = request.json(&body).send().await.map_err(|e| {
            EmbeddingError::Connection {
                provider: "openai",
                target: url.clone(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(EmbeddingError::Auth {
                    provider: "openai",
                    credential: self.rejected_credential(),
                });
            }
            if status.as_u16() == 429 {
                return Err(EmbeddingError::RateLimited { provider: "openai" });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                provider: "openai",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::Protocol {
                    provider: "openai",
                    detail: format!("invalid response body: {}", e),
                })?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::Protocol {
                provider: "openai",
                detail: format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            });
        }

        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}
