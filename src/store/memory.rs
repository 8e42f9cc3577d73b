//! In-memory [`ChunkStore`] for tests and embedded use.
//!
//! A `Vec` behind `std::sync::RwLock`; the per-version replace happens
//! under a single write lock, so readers see either the old or the new
//! chunk set. Similarity search is brute-force cosine over all stored
//! vectors.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::{format_ts_iso, role_matches, ChunkStore, ScoredChunk};
use crate::embedding::cosine_similarity;
use crate::models::{GovernanceChunk, SectionInfo, VersionInfo};

pub struct MemoryStore {
    chunks: RwLock<Vec<GovernanceChunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn replace_version(&self, version: &str, chunks: &[GovernanceChunk]) -> Result<()> {
        let mut stored = self.chunks.write().unwrap();
        stored.retain(|c| c.version != version);
        stored.extend(chunks.iter().cloned());
        Ok(())
    }

    async fn fetch_chunks(&self, version: Option<&str>) -> Result<Vec<GovernanceChunk>> {
        let stored = self.chunks.read().unwrap();
        let mut chunks: Vec<GovernanceChunk> = stored
            .iter()
            .filter(|c| version.map_or(true, |v| c.version == v))
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.section_index);
        Ok(chunks)
    }

    async fn list_sections(&self, version: Option<&str>) -> Result<Vec<SectionInfo>> {
        let chunks = self.fetch_chunks(version).await?;
        Ok(chunks
            .into_iter()
            .map(|c| SectionInfo {
                id: c.id,
                section: c.section,
                heading_level: c.heading_level,
                section_index: c.section_index,
                version: c.version,
                roles_affected: c.roles_affected,
                gate_type: c.gate_type,
                updated_at: format_ts_iso(c.updated_at),
                has_embedding: c.embedding.is_some(),
            })
            .collect())
    }

    async fn latest_version(&self) -> Result<Option<VersionInfo>> {
        let stored = self.chunks.read().unwrap();
        let latest = match stored.iter().max_by_key(|c| c.updated_at) {
            Some(c) => (c.version.clone(), c.updated_at),
            None => return Ok(None),
        };

        let chunk_count = stored.iter().filter(|c| c.version == latest.0).count() as i64;
        let embedded_count = stored
            .iter()
            .filter(|c| c.version == latest.0 && c.embedding.is_some())
            .count() as i64;

        Ok(Some(VersionInfo {
            version: latest.0,
            updated_at: format_ts_iso(latest.1),
            chunk_count,
            embedded_count,
        }))
    }

    async fn embedded_count(&self, version: Option<&str>) -> Result<i64> {
        let stored = self.chunks.read().unwrap();
        Ok(stored
            .iter()
            .filter(|c| c.embedding.is_some() && version.map_or(true, |v| c.version == v))
            .count() as i64)
    }

    async fn similarity_search(
        &self,
        query_vec: &[f32],
        role: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let stored = self.chunks.read().unwrap();
        let mut candidates: Vec<ScoredChunk> = stored
            .iter()
            .filter_map(|c| {
                let vector = c.embedding.as_ref()?;
                if let Some(role) = role {
                    if !role_matches(&c.roles_affected, role) {
                        return None;
                    }
                }
                let score = cosine_similarity(query_vec, vector) as f64;
                let mut chunk = c.clone();
                chunk.embedding = None;
                Some(ScoredChunk { chunk, score })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}
