use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // One row per chunk; roles_affected is a JSON array, embedding is a
    // little-endian f32 BLOB (or NULL when ingestion ran unembedded).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS governance_chunks (
            id TEXT PRIMARY KEY,
            version TEXT NOT NULL,
            section TEXT NOT NULL,
            heading_level INTEGER NOT NULL,
            section_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            roles_affected TEXT NOT NULL DEFAULT '["ALL"]',
            gate_type TEXT,
            embedding BLOB,
            updated_at INTEGER NOT NULL,
            UNIQUE(version, section_index)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_governance_chunks_version ON governance_chunks(version)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_governance_chunks_updated_at \
         ON governance_chunks(updated_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
