//! Hybrid retrieval engine.
//!
//! Mode selection happens per call, since the corpus changes across
//! ingestions: vector ranking runs only when a provider is active AND at
//! least one stored chunk carries an embedding; otherwise the engine falls
//! back to deterministic keyword scoring. A query-time embedding failure
//! also falls back to keyword for that call. Every outcome reports which
//! mode served it.
//!
//! Keyword scoring: lowercase the query, split on whitespace, drop tokens
//! of length ≤ 2, and score each chunk by the total number of substring
//! occurrences of the surviving tokens in `"section content"`. A role
//! filter multiplies matching chunks' scores by 1.5. Zero scores are
//! dropped; ties keep ingestion order.

use anyhow::Result;
use std::sync::Arc;

use crate::config::{Config, EmbeddingSettings};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::ValidationError;
use crate::models::{GovernanceChunk, SearchMode, SearchOutcome, SearchResultItem};
use crate::store::sqlite::SqliteStore;
use crate::store::{role_matches, ChunkStore, ScoredChunk};

/// Score multiplier for chunks whose roles include the requested role.
const ROLE_BOOST: f64 = 1.5;

/// Answer a query against the stored corpus.
pub async fn search_chunks(
    store: &dyn ChunkStore,
    provider: Option<&Arc<dyn EmbeddingProvider>>,
    query: &str,
    role: Option<&str>,
    limit: usize,
) -> Result<SearchOutcome> {
    if query.trim().is_empty() {
        return Err(ValidationError::EmptyQuery.into());
    }
    if limit == 0 {
        return Err(ValidationError::InvalidLimit.into());
    }

    if let Some(provider) = provider {
        if store.embedded_count(None).await? > 0 {
            match provider.embed(query).await {
                Ok(query_vec) => {
                    let candidates = store.similarity_search(&query_vec, role, limit).await?;
                    return Ok(SearchOutcome {
                        results: candidates.into_iter().map(result_item).collect(),
                        mode: SearchMode::Vector,
                    });
                }
                Err(e) => {
                    eprintln!(
                        "Warning: query embedding failed, falling back to keyword search: {}",
                        e
                    );
                }
            }
        }
    }

    let chunks = store.fetch_chunks(None).await?;
    Ok(SearchOutcome {
        results: keyword_rank(&chunks, query, role, limit),
        mode: SearchMode::Keyword,
    })
}

fn result_item(scored: ScoredChunk) -> SearchResultItem {
    SearchResultItem {
        section: scored.chunk.section,
        content: scored.chunk.content,
        version: scored.chunk.version,
        heading_level: scored.chunk.heading_level,
        roles_affected: scored.chunk.roles_affected,
        gate_type: scored.chunk.gate_type,
        score: scored.score,
    }
}

/// Deterministic keyword ranking over an already-fetched chunk list.
pub fn keyword_rank(
    chunks: &[GovernanceChunk],
    query: &str,
    role: Option<&str>,
    limit: usize,
) -> Vec<SearchResultItem> {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .collect();

    let mut scored: Vec<(f64, &GovernanceChunk)> = chunks
        .iter()
        .filter_map(|chunk| {
            let haystack = format!("{} {}", chunk.section, chunk.content).to_lowercase();
            let raw: usize = tokens.iter().map(|t| haystack.matches(t).count()).sum();
            if raw == 0 {
                return None;
            }
            let mut score = raw as f64;
            if let Some(role) = role {
                if role_matches(&chunk.roles_affected, role) {
                    score *= ROLE_BOOST;
                }
            }
            Some((score, chunk))
        })
        .collect();

    // sort_by is stable: equal scores keep ingestion order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(score, chunk)| SearchResultItem {
            section: chunk.section.clone(),
            content: chunk.content.clone(),
            version: chunk.version.clone(),
            heading_level: chunk.heading_level,
            roles_affected: chunk.roles_affected.clone(),
            gate_type: chunk.gate_type.clone(),
            score,
        })
        .collect()
}

/// CLI entry point: run a query and print ranked results.
pub async fn run_search(
    config: &Config,
    query: &str,
    role: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let settings = EmbeddingSettings::resolve(&config.embedding);
    let provider = embedding::create_provider(&settings)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let limit = limit.unwrap_or(config.retrieval.default_limit);
    let outcome = search_chunks(&store, provider.as_ref(), query, role.as_deref(), limit).await?;

    if outcome.results.is_empty() {
        println!("No results. (mode: {})", outcome.mode);
        store.pool().close().await;
        return Ok(());
    }

    println!("{} results (mode: {})", outcome.results.len(), outcome.mode);
    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} (v{})",
            i + 1,
            result.score,
            result.section,
            result.version
        );
        println!(
            "    roles: {}  gate: {}",
            result.roles_affected.join(","),
            result.gate_type.as_deref().unwrap_or("-")
        );
        let excerpt: String = result.content.chars().take(160).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
    }

    store.pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::EmbeddingError;
    use crate::store::memory::MemoryStore;
    use crate::tagger;

    fn make_chunk(index: i64, section: &str, content: &str) -> GovernanceChunk {
        GovernanceChunk {
            id: format!("chunk-{}", index),
            version: "1.0.0".to_string(),
            section: section.to_string(),
            heading_level: 2,
            section_index: index,
            content: content.to_string(),
            roles_affected: tagger::detect_roles(content),
            gate_type: tagger::detect_gate_type(section).map(str::to_string),
            embedding: None,
            updated_at: 1_700_000_000,
        }
    }

    /// Provider that embeds along a fixed axis per keyword, so cosine
    /// ranking is predictable.
    struct AxisProvider;

    fn axis_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        vec![
            lower.matches("qa").count() as f32,
            lower.matches("security").count() as f32,
            1.0,
        ]
    }

    #[async_trait]
    impl EmbeddingProvider for AxisProvider {
        fn name(&self) -> &'static str {
            "axis"
        }
        fn dimensions(&self) -> usize {
            3
        }
        fn max_batch_size(&self) -> usize {
            16
        }
        async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| axis_vector(t)).collect())
        }
    }

    /// Provider that fails at query time.
    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        fn name(&self) -> &'static str {
            "down"
        }
        fn dimensions(&self) -> usize {
            3
        }
        fn max_batch_size(&self) -> usize {
            16
        }
        async fn embed_page(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::NotConfigured)
        }
    }

    #[test]
    fn test_keyword_scoring_and_zero_drop() {
        let chunks = vec![
            make_chunk(0, "QA Approval Gates", "Automated QA gate checks must pass."),
            make_chunk(1, "Office Layout", "Desks and chairs."),
        ];
        let results = keyword_rank(&chunks, "QA gates", None, 5);

        // "qa" is dropped (len <= 2); "gates" matches the QA section only.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].section, "QA Approval Gates");
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_short_tokens_discarded() {
        let chunks = vec![make_chunk(0, "CI Policy", "On it we do go.")];
        // Every token has length <= 2; nothing can match.
        let results = keyword_rank(&chunks, "on it we go", None, 5);
        assert!(results.is_empty());
    }

    #[test]
    fn test_occurrences_counted_not_just_presence() {
        let chunks = vec![
            make_chunk(0, "Deployment", "deploy deploy deploy"),
            make_chunk(1, "Other Deployment", "deploy once"),
        ];
        let results = keyword_rank(&chunks, "deploy", None, 5);
        assert_eq!(results[0].section, "Deployment");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_role_boost_breaks_equal_raw_scores() {
        // Equal raw scores (3 each for "release cadence"); only the second
        // chunk carries the BACKEND role.
        let chunks = vec![
            make_chunk(0, "Web Release Duty", "Frontend teams follow the release cadence."),
            make_chunk(1, "API Release Duty", "Backend teams follow the release cadence."),
        ];
        assert_eq!(chunks[0].roles_affected, vec!["FRONTEND".to_string()]);
        assert_eq!(chunks[1].roles_affected, vec!["BACKEND".to_string()]);

        // Without a role filter, the tie keeps ingestion order.
        let unboosted = keyword_rank(&chunks, "release cadence", None, 5);
        assert_eq!(unboosted[0].section, "Web Release Duty");
        assert_eq!(unboosted[0].score, unboosted[1].score);

        // The boost promotes the BACKEND chunk past the tie.
        let boosted = keyword_rank(&chunks, "release cadence", Some("BACKEND"), 5);
        assert_eq!(boosted[0].section, "API Release Duty");
        assert!(boosted[0].score > boosted[1].score);
    }

    #[test]
    fn test_ties_keep_ingestion_order() {
        let chunks = vec![
            make_chunk(0, "Alpha deploy", "one"),
            make_chunk(1, "Beta deploy", "one"),
            make_chunk(2, "Gamma deploy", "one"),
        ];
        let results = keyword_rank(&chunks, "deploy", None, 5);
        let sections: Vec<&str> = results.iter().map(|r| r.section.as_str()).collect();
        assert_eq!(sections, vec!["Alpha deploy", "Beta deploy", "Gamma deploy"]);
    }

    #[test]
    fn test_limit_truncates() {
        let chunks: Vec<GovernanceChunk> = (0..10)
            .map(|i| make_chunk(i, &format!("Section {}", i), "deploy"))
            .collect();
        let results = keyword_rank(&chunks, "deploy", None, 3);
        assert_eq!(results.len(), 3);
    }

    async fn seeded_store(embedded: bool) -> MemoryStore {
        let store = MemoryStore::new();
        let mut chunks = vec![
            make_chunk(0, "QA Approval Gate", "Automated QA checks must pass."),
            make_chunk(1, "Security Review", "Security sign-off required."),
            make_chunk(2, "Glossary", "Terms and definitions."),
        ];
        if embedded {
            for c in chunks.iter_mut() {
                c.embedding = Some(axis_vector(&format!("{}\n\n{}", c.section, c.content)));
            }
        }
        store.replace_version("1.0.0", &chunks).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_unembedded_corpus_uses_keyword_even_with_provider() {
        let store = seeded_store(false).await;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(AxisProvider);
        let outcome = search_chunks(&store, Some(&provider), "security review", None, 5)
            .await
            .unwrap();
        assert_eq!(outcome.mode, SearchMode::Keyword);
    }

    #[tokio::test]
    async fn test_embedded_corpus_switches_to_vector_mode() {
        let store = seeded_store(true).await;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(AxisProvider);
        let outcome = search_chunks(&store, Some(&provider), "security posture", None, 5)
            .await
            .unwrap();
        assert_eq!(outcome.mode, SearchMode::Vector);
        assert_eq!(outcome.results[0].section, "Security Review");
    }

    #[tokio::test]
    async fn test_no_provider_always_keyword() {
        let store = seeded_store(true).await;
        let outcome = search_chunks(&store, None, "security", None, 5).await.unwrap();
        assert_eq!(outcome.mode, SearchMode::Keyword);
    }

    #[tokio::test]
    async fn test_query_embed_failure_falls_back_to_keyword() {
        let store = seeded_store(true).await;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(DownProvider);
        let outcome = search_chunks(&store, Some(&provider), "security", None, 5)
            .await
            .unwrap();
        assert_eq!(outcome.mode, SearchMode::Keyword);
        assert!(!outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_vector_mode_role_prefilter() {
        let store = seeded_store(true).await;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(AxisProvider);
        let outcome = search_chunks(&store, Some(&provider), "qa", Some("QA"), 5)
            .await
            .unwrap();
        assert_eq!(outcome.mode, SearchMode::Vector);
        for result in &outcome.results {
            assert!(result
                .roles_affected
                .iter()
                .any(|r| r == "QA" || r == "ALL"));
        }
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = seeded_store(false).await;
        let err = search_chunks(&store, None, "  ", None, 5).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let store = seeded_store(false).await;
        let err = search_chunks(&store, None, "query", None, 0).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::InvalidLimit)
        ));
    }
}
