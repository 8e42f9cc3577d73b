//! Core data models for the governance ingestion and retrieval pipeline.
//!
//! These types represent the document chunks, listings, and search results
//! that flow between the chunker, tagger, embedding layer, store, and the
//! delivery surfaces.

use serde::Serialize;

/// Chunker output before tagging, IDs, and embeddings are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    /// Section title; sub-chunks carry `"<parent> > <sub-heading>"`.
    pub section: String,
    /// Heading level 1–3. Sub-chunks inherit the parent's level.
    pub heading_level: i64,
    /// Trimmed raw text, heading line included.
    pub content: String,
}

/// A retrievable unit of the governance document, as stored.
#[derive(Debug, Clone)]
pub struct GovernanceChunk {
    pub id: String,
    pub version: String,
    pub section: String,
    pub heading_level: i64,
    /// Dense position `0..N-1` within the version; defines display order
    /// and keyword-search tie-breaking.
    pub section_index: i64,
    pub content: String,
    /// Never empty; `["ALL"]` when no role keyword matched.
    pub roles_affected: Vec<String>,
    pub gate_type: Option<String>,
    /// Present iff a provider was configured and the ingestion batch call
    /// succeeded. Length equals the provider's dimensions.
    pub embedding: Option<Vec<f32>>,
    pub updated_at: i64,
}

/// Chunk metadata (no content) for the sections listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    pub id: String,
    pub section: String,
    pub heading_level: i64,
    pub section_index: i64,
    pub version: String,
    pub roles_affected: Vec<String>,
    pub gate_type: Option<String>,
    pub updated_at: String,
    pub has_embedding: bool,
}

/// Summary of the most recently updated document version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub updated_at: String,
    pub chunk_count: i64,
    pub embedded_count: i64,
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub section: String,
    pub content: String,
    pub version: String,
    pub heading_level: i64,
    pub roles_affected: Vec<String>,
    pub gate_type: Option<String>,
    /// Cosine similarity in vector mode, token-occurrence score in keyword
    /// mode.
    pub score: f64,
}

/// Which retrieval strategy served a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Vector,
    Keyword,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Vector => write!(f, "vector"),
            SearchMode::Keyword => write!(f, "keyword"),
        }
    }
}

/// Result of a retrieval call, including the mode that served it.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResultItem>,
    pub mode: SearchMode,
}

/// Ingestion report. `embedded_count < inserted_count` signals a degraded
/// (partially or fully unembedded) ingestion without log inspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub inserted_count: usize,
    pub embedded_count: usize,
    pub version: String,
    pub embedding_provider: Option<String>,
}
