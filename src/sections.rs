//! Sections listing: per-chunk metadata with embedding coverage.
//!
//! Read-only view over the stored chunk set (content excluded), ordered by
//! position index. Used by `govx sections` to verify what an ingestion
//! produced and which chunks carry vectors.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::sqlite::SqliteStore;
use crate::store::ChunkStore;

pub async fn run_sections(config: &Config, version: Option<String>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let sections = store.list_sections(version.as_deref()).await?;
    let embedded = sections.iter().filter(|s| s.has_embedding).count();

    println!("governance sections");
    println!("  total: {}", sections.len());
    println!("  embedded: {}", embedded);

    if !sections.is_empty() {
        println!();
        println!(
            "  {:<4} {:<42} {:>5} {:>9}  {:<13} {}",
            "IDX", "SECTION", "LEVEL", "EMBEDDED", "GATE", "ROLES"
        );
        println!("  {}", "-".repeat(92));
        for s in &sections {
            println!(
                "  {:<4} {:<42} {:>5} {:>9}  {:<13} {}",
                s.section_index,
                truncate(&s.section, 42),
                s.heading_level,
                if s.has_embedding { "yes" } else { "no" },
                s.gate_type.as_deref().unwrap_or("-"),
                s.roles_affected.join(",")
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_unchanged() {
        assert_eq!(truncate("QA Gate", 42), "QA Gate");
    }

    #[test]
    fn test_truncate_long_marks_ellipsis() {
        let long = "A".repeat(60);
        let out = truncate(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }
}
