//! Ingestion orchestration.
//!
//! Coordinates the full flow for one document version: validate → chunk →
//! tag → batch-embed → per-version replace. Embedding is best-effort: a
//! batch failure stores every chunk without vectors instead of aborting
//! the ingestion, and the returned [`IngestOutcome`] exposes the gap via
//! `embedded_count` vs `inserted_count`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::chunker::chunk_document;
use crate::config::{Config, EmbeddingSettings};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::ValidationError;
use crate::models::{GovernanceChunk, IngestOutcome};
use crate::store::sqlite::SqliteStore;
use crate::store::ChunkStore;
use crate::tagger;

/// Ingest one document version: replace all of the version's chunks with
/// the chunked, tagged, and (when possible) embedded content.
///
/// The replace is full, never a merge — re-ingesting a version leaves
/// exactly the new chunk set. Position indices are assigned densely in
/// chunk order.
pub async fn ingest_document(
    store: &dyn ChunkStore,
    provider: Option<&Arc<dyn EmbeddingProvider>>,
    content: &str,
    version: &str,
    split_threshold: usize,
) -> Result<IngestOutcome> {
    if content.trim().is_empty() {
        return Err(ValidationError::MissingContent.into());
    }
    if version.trim().is_empty() {
        return Err(ValidationError::MissingVersion.into());
    }

    let drafts = chunk_document(content, split_threshold);

    // Tag the final chunk set: sub-chunking can narrow a chunk's detected
    // roles or gate relative to its parent section.
    let tagged: Vec<(crate::models::DraftChunk, Vec<String>, Option<&'static str>)> = drafts
        .into_iter()
        .map(|draft| {
            let roles = tagger::detect_roles(&draft.content);
            let gate = tagger::detect_gate_type(&draft.section);
            (draft, roles, gate)
        })
        .collect();

    let vectors = match provider {
        Some(provider) => {
            let texts: Vec<String> = tagged
                .iter()
                .map(|(draft, _, _)| format!("{}\n\n{}", draft.section, draft.content))
                .collect();
            match provider.embed_batch(&texts).await {
                Ok(vectors) => Some(vectors),
                Err(e) => {
                    eprintln!(
                        "Warning: embedding batch failed, storing chunks without embeddings: {}",
                        e
                    );
                    None
                }
            }
        }
        None => None,
    };

    let now = chrono::Utc::now().timestamp();
    let chunks: Vec<GovernanceChunk> = tagged
        .into_iter()
        .enumerate()
        .map(|(index, (draft, roles, gate))| GovernanceChunk {
            id: Uuid::new_v4().to_string(),
            version: version.to_string(),
            section: draft.section,
            heading_level: draft.heading_level,
            section_index: index as i64,
            content: draft.content,
            roles_affected: roles,
            gate_type: gate.map(str::to_string),
            embedding: vectors.as_ref().and_then(|v| v.get(index).cloned()),
            updated_at: now,
        })
        .collect();

    store.replace_version(version, &chunks).await?;

    let embedded_count = chunks.iter().filter(|c| c.embedding.is_some()).count();
    Ok(IngestOutcome {
        inserted_count: chunks.len(),
        embedded_count,
        version: version.to_string(),
        embedding_provider: provider.map(|p| p.name().to_string()),
    })
}

/// CLI entry point: read the document from disk and ingest it.
pub async fn run_ingest(config: &Config, file: &Path, version: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read document: {}", file.display()))?;

    let settings = EmbeddingSettings::resolve(&config.embedding);
    let provider = embedding::create_provider(&settings)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let outcome = ingest_document(
        &store,
        provider.as_ref(),
        &content,
        version,
        config.chunking.split_threshold_lines,
    )
    .await?;

    println!("ingest v{}", outcome.version);
    println!("  chunks inserted: {}", outcome.inserted_count);
    println!("  chunks embedded: {}", outcome.embedded_count);
    println!(
        "  provider: {}",
        outcome.embedding_provider.as_deref().unwrap_or("none")
    );
    println!("ok");

    store.pool().close().await;
    Ok(())
}
