//! TOML configuration parsing and embedding-settings resolution.
//!
//! The file layout mirrors `config/govx.example.toml`. Embedding settings
//! resolve in two steps: values from the `[embedding]` tables win, and any
//! unset field falls back to the conventional environment variable
//! (`OLLAMA_URL`, `VOYAGE_API_KEY`, `OPENAI_API_KEY`, `AZURE_OPENAI_*`,
//! `EMBEDDING_PROVIDER`). Auto-detection probes the resolved settings in a
//! fixed priority: Ollama (local-first) > Voyage > OpenAI.

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Sections at heading level 1–2 with more content lines than this are
    /// split on their level-3 sub-headings.
    #[serde(default = "default_split_threshold")]
    pub split_threshold_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            split_threshold_lines: default_split_threshold(),
        }
    }
}

fn default_split_threshold() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Result limit applied when a query does not specify one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Explicit provider selection (`ollama`, `voyage`, `openai`). Takes
    /// precedence over auto-detection.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub voyage: VoyageConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            timeout_secs: default_timeout_secs(),
            ollama: OllamaConfig::default(),
            voyage: VoyageConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OllamaConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct VoyageConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Override for self-hosted gateways; defaults to the public endpoint.
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    #[serde(default)]
    pub azure_key: Option<String>,
    #[serde(default)]
    pub azure_deployment: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Override for the standard (non-Azure) endpoint.
    #[serde(default)]
    pub api_url: Option<String>,
}

// ============ Resolved embedding settings ============

/// Embedding settings after config/env merging, ready for provider
/// construction.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: Option<String>,
    pub timeout_secs: u64,
    pub ollama: OllamaSettings,
    pub voyage: VoyageSettings,
    pub openai: OpenAiSettings,
}

#[derive(Debug, Clone, Default)]
pub struct OllamaSettings {
    /// Presence of a URL (config or `OLLAMA_URL`) is the auto-detection
    /// signal; an explicitly selected provider falls back to localhost.
    pub url: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct VoyageSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_key: Option<String>,
    pub azure_deployment: Option<String>,
    pub model: String,
    pub api_url: Option<String>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl EmbeddingSettings {
    /// Merge the `[embedding]` config tables with environment fallbacks.
    pub fn resolve(config: &EmbeddingConfig) -> Self {
        Self {
            provider: config
                .provider
                .clone()
                .or_else(|| env_opt("EMBEDDING_PROVIDER")),
            timeout_secs: config.timeout_secs,
            ollama: OllamaSettings {
                url: config.ollama.url.clone().or_else(|| env_opt("OLLAMA_URL")),
                model: config
                    .ollama
                    .model
                    .clone()
                    .or_else(|| env_opt("OLLAMA_EMBED_MODEL"))
                    .unwrap_or_else(|| "mxbai-embed-large".to_string()),
            },
            voyage: VoyageSettings {
                api_key: config
                    .voyage
                    .api_key
                    .clone()
                    .or_else(|| env_opt("VOYAGE_API_KEY")),
                model: config
                    .voyage
                    .model
                    .clone()
                    .or_else(|| env_opt("VOYAGE_EMBED_MODEL"))
                    .unwrap_or_else(|| "voyage-3".to_string()),
                api_url: config.voyage.api_url.clone(),
            },
            openai: OpenAiSettings {
                api_key: config
                    .openai
                    .api_key
                    .clone()
                    .or_else(|| env_opt("OPENAI_API_KEY")),
                azure_endpoint: config
                    .openai
                    .azure_endpoint
                    .clone()
                    .or_else(|| env_opt("AZURE_OPENAI_ENDPOINT")),
                azure_key: config
                    .openai
                    .azure_key
                    .clone()
                    .or_else(|| env_opt("AZURE_OPENAI_KEY")),
                azure_deployment: config
                    .openai
                    .azure_deployment
                    .clone()
                    .or_else(|| env_opt("AZURE_OPENAI_DEPLOYMENT")),
                model: config
                    .openai
                    .model
                    .clone()
                    .or_else(|| env_opt("OPENAI_EMBED_MODEL"))
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                api_url: config.openai.api_url.clone(),
            },
        }
    }

    /// The provider these settings select: the explicit name if set,
    /// otherwise the first backend with configuration present, in priority
    /// order Ollama > Voyage > OpenAI. `None` means embeddings are off.
    pub fn active_provider(&self) -> Option<&str> {
        if let Some(name) = self.provider.as_deref() {
            return Some(name);
        }
        if self.ollama.url.is_some() {
            Some("ollama")
        } else if self.voyage.api_key.is_some() {
            Some("voyage")
        } else if self.openai.api_key.is_some() || self.openai.azure_endpoint.is_some() {
            Some("openai")
        } else {
            None
        }
    }

    /// Stable digest of every provider-relevant field. The resolver caches
    /// the constructed provider under this key and only re-probes when the
    /// fingerprint changes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [
            self.provider.as_deref().unwrap_or(""),
            self.ollama.url.as_deref().unwrap_or(""),
            &self.ollama.model,
            self.voyage.api_key.as_deref().unwrap_or(""),
            &self.voyage.model,
            self.voyage.api_url.as_deref().unwrap_or(""),
            self.openai.api_key.as_deref().unwrap_or(""),
            self.openai.azure_endpoint.as_deref().unwrap_or(""),
            self.openai.azure_key.as_deref().unwrap_or(""),
            self.openai.azure_deployment.as_deref().unwrap_or(""),
            &self.openai.model,
            self.openai.api_url.as_deref().unwrap_or(""),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        format!("{:x}", hasher.finalize())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.split_threshold_lines == 0 {
        anyhow::bail!("chunking.split_threshold_lines must be > 0");
    }

    if config.retrieval.default_limit < 1 {
        anyhow::bail!("retrieval.default_limit must be >= 1");
    }

    if let Some(provider) = config.embedding.provider.as_deref() {
        match provider {
            "ollama" | "voyage" | "openai" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be ollama, voyage, or openai.",
                other
            ),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            provider: None,
            timeout_secs: 30,
            ollama: OllamaSettings {
                url: None,
                model: "mxbai-embed-large".to_string(),
            },
            voyage: VoyageSettings {
                api_key: None,
                model: "voyage-3".to_string(),
                api_url: None,
            },
            openai: OpenAiSettings {
                api_key: None,
                azure_endpoint: None,
                azure_key: None,
                azure_deployment: None,
                model: "text-embedding-3-small".to_string(),
                api_url: None,
            },
        }
    }

    #[test]
    fn test_no_configuration_detects_nothing() {
        assert_eq!(bare_settings().active_provider(), None);
    }

    #[test]
    fn test_detection_priority_ollama_first() {
        let mut settings = bare_settings();
        settings.ollama.url = Some("http://localhost:11434".to_string());
        settings.voyage.api_key = Some("vk".to_string());
        settings.openai.api_key = Some("ok".to_string());
        assert_eq!(settings.active_provider(), Some("ollama"));
    }

    #[test]
    fn test_detection_priority_voyage_over_openai() {
        let mut settings = bare_settings();
        settings.voyage.api_key = Some("vk".to_string());
        settings.openai.api_key = Some("ok".to_string());
        assert_eq!(settings.active_provider(), Some("voyage"));
    }

    #[test]
    fn test_azure_endpoint_alone_detects_openai() {
        let mut settings = bare_settings();
        settings.openai.azure_endpoint = Some("https://corp.openai.azure.com".to_string());
        assert_eq!(settings.active_provider(), Some("openai"));
    }

    #[test]
    fn test_explicit_provider_beats_detection() {
        let mut settings = bare_settings();
        settings.ollama.url = Some("http://localhost:11434".to_string());
        settings.provider = Some("voyage".to_string());
        assert_eq!(settings.active_provider(), Some("voyage"));
    }

    #[test]
    fn test_fingerprint_changes_with_settings() {
        let a = bare_settings();
        let mut b = bare_settings();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.ollama.url = Some("http://localhost:11434".to_string());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_load_config_rejects_unknown_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("govx.toml");
        std::fs::write(
            &path,
            r#"
[db]
path = "data/gov.sqlite"

[server]
bind = "127.0.0.1:7600"

[embedding]
provider = "cohere"
"#,
        )
        .unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_load_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("govx.toml");
        std::fs::write(
            &path,
            r#"
[db]
path = "data/gov.sqlite"

[server]
bind = "127.0.0.1:7600"
"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.split_threshold_lines, 150);
        assert_eq!(config.retrieval.default_limit, 5);
        assert_eq!(config.embedding.timeout_secs, 30);
        assert!(config.embedding.provider.is_none());
    }
}
