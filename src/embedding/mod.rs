//! Embedding provider abstraction and selection.
//!
//! Defines the [`EmbeddingProvider`] trait and wires up the three concrete
//! backends:
//! - **[`OllamaProvider`]** — local inference via an Ollama instance's
//!   `/api/embed` endpoint; no API key needed.
//! - **[`VoyageProvider`]** — the Voyage AI cloud embeddings API.
//! - **[`OpenAiProvider`]** — the OpenAI embeddings API, with either a
//!   standard API key or an Azure endpoint/key/deployment triplet.
//!
//! All backends produce 1024-dimension vectors so the stored vector column
//! has a single fixed width regardless of which provider is active.
//!
//! # Provider selection
//!
//! [`create_provider`] consults [`EmbeddingSettings::active_provider`]:
//! an explicit setting wins, otherwise backends are probed in fixed
//! priority (Ollama > Voyage > OpenAI). With nothing configured it returns
//! `Ok(None)` and callers run without embeddings. [`ProviderResolver`]
//! memoizes the constructed provider keyed by a settings fingerprint so hot
//! paths skip re-probing until the configuration actually changes.
//!
//! # Failure semantics
//!
//! One HTTP attempt per page, no retries in this layer. Rate limits come
//! back as [`EmbeddingError::RateLimited`] so the caller decides whether to
//! back off; rejected credentials come back as [`EmbeddingError::Auth`]
//! naming the credential.
//!
//! Also provides vector utilities shared with the store backends:
//! [`cosine_similarity`], [`vec_to_blob`], and [`blob_to_vec`].

pub mod ollama;
pub mod openai;
pub mod voyage;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use voyage::VoyageProvider;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::config::EmbeddingSettings;
use crate::error::EmbeddingError;

/// Capability contract every embedding backend implements.
///
/// `embed_batch` has a default implementation that transparently pages
/// inputs larger than [`max_batch_size`](Self::max_batch_size), preserving
/// order and count. Paging is all-or-nothing: if any page fails the whole
/// call fails and no partial result is returned.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider identifier (`"ollama"`, `"voyage"`, `"openai"`).
    fn name(&self) -> &'static str;

    /// Fixed output vector length.
    fn dimensions(&self) -> usize;

    /// Largest number of texts the backend accepts in a single request.
    fn max_batch_size(&self) -> usize;

    /// Issue one embedding request for at most `max_batch_size` texts.
    ///
    /// Implementations must return exactly one vector per input text, in
    /// input order, or an [`EmbeddingError::Protocol`].
    async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a batch of texts, paging oversized inputs transparently.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() <= self.max_batch_size() {
            return self.embed_page(texts).await;
        }
        let mut vectors = Vec::with_capacity(texts.len());
        for page in texts.chunks(self.max_batch_size()) {
            vectors.extend(self.embed_page(page).await?);
        }
        Ok(vectors)
    }

    /// Embed a single text (e.g. a search query).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(EmbeddingError::Protocol {
                provider: self.name(),
                detail: "expected exactly one embedding".to_string(),
            }),
        }
    }
}

/// Construct the provider selected by `settings`.
///
/// Returns `Ok(None)` when no provider is configured. Construction fails
/// (rather than the first call) when the selected backend's credentials
/// are missing or incomplete.
pub fn create_provider(
    settings: &EmbeddingSettings,
) -> Result<Option<Arc<dyn EmbeddingProvider>>, EmbeddingError> {
    let name = match settings.active_provider() {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    let provider: Arc<dyn EmbeddingProvider> = match name.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(settings)?),
        "voyage" => Arc::new(VoyageProvider::new(settings)?),
        "openai" => Arc::new(OpenAiProvider::new(settings)?),
        other => {
            return Err(EmbeddingError::Configuration {
                provider: "embedding",
                detail: format!("unknown embedding provider: {}", other),
            })
        }
    };

    Ok(Some(provider))
}

/// Memoizing provider resolver.
///
/// Caches the constructed provider under a fingerprint of the resolved
/// settings; the configuration is only re-probed when the fingerprint
/// changes. Keeps ingestion and retrieval free of process-global state
/// while avoiding a settings scan per request.
pub struct ProviderResolver {
    cached: Mutex<Option<(String, Option<Arc<dyn EmbeddingProvider>>)>>,
}

impl ProviderResolver {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    /// Resolve the active provider for `settings`, reusing the cached
    /// instance while the settings fingerprint is unchanged.
    pub fn resolve(
        &self,
        settings: &EmbeddingSettings,
    ) -> Result<Option<Arc<dyn EmbeddingProvider>>, EmbeddingError> {
        let fingerprint = settings.fingerprint();
        let mut cached = self.cached.lock().unwrap();
        if let Some((cached_fp, provider)) = cached.as_ref() {
            if *cached_fp == fingerprint {
                return Ok(provider.clone());
            }
        }
        let provider = create_provider(settings)?;
        *cached = Some((fingerprint, provider.clone()));
        Ok(provider)
    }
}

impl Default for ProviderResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
