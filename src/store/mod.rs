//! Storage abstraction for governance chunks.
//!
//! The [`ChunkStore`] trait defines every storage operation the ingestion
//! orchestrator and retrieval engine need, keeping both independent of the
//! concrete backend. [`sqlite::SqliteStore`] is the production backend;
//! [`memory::MemoryStore`] backs the engine tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{GovernanceChunk, SectionInfo, VersionInfo};

/// A chunk paired with its ranking score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: GovernanceChunk,
    /// Cosine similarity against the query vector.
    pub score: f64,
}

/// Abstract storage backend for governance chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_version`](ChunkStore::replace_version) | Atomically replace all chunks of one version |
/// | [`fetch_chunks`](ChunkStore::fetch_chunks) | Full chunks in position order |
/// | [`list_sections`](ChunkStore::list_sections) | Chunk metadata (no content) with embedding flags |
/// | [`latest_version`](ChunkStore::latest_version) | Most recently updated version with counts |
/// | [`embedded_count`](ChunkStore::embedded_count) | Number of chunks carrying a vector |
/// | [`similarity_search`](ChunkStore::similarity_search) | Rank embedded chunks by cosine similarity |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Delete every chunk stored under `version` and insert `chunks` in
    /// order. The replacement must be atomic to readers: a concurrent read
    /// must observe either the old chunk set or the new one, never an
    /// empty intermediate state.
    async fn replace_version(&self, version: &str, chunks: &[GovernanceChunk]) -> Result<()>;

    /// All chunks, position order; optionally scoped to one version.
    async fn fetch_chunks(&self, version: Option<&str>) -> Result<Vec<GovernanceChunk>>;

    /// Chunk metadata for the listing surface, position order.
    async fn list_sections(&self, version: Option<&str>) -> Result<Vec<SectionInfo>>;

    /// The most recently updated version and its chunk/embedding counts,
    /// or `None` when nothing has been ingested.
    async fn latest_version(&self) -> Result<Option<VersionInfo>>;

    /// How many chunks currently carry an embedding.
    async fn embedded_count(&self, version: Option<&str>) -> Result<i64>;

    /// Rank embedded chunks by cosine similarity to `query_vec`,
    /// descending. With a role filter, only chunks whose `roles_affected`
    /// contain the role (or `ALL`) are considered.
    async fn similarity_search(
        &self,
        query_vec: &[f32],
        role: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;
}

/// True when a chunk's roles admit the requested role.
pub(crate) fn role_matches(roles: &[String], role: &str) -> bool {
    roles.iter().any(|r| r == role || r == crate::tagger::ROLE_ALL)
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
