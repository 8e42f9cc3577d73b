//! SQLite-backed [`ChunkStore`].
//!
//! Chunks live in the `governance_chunks` table (see `migrate`):
//! `roles_affected` is a JSON array column and `embedding` is a
//! little-endian f32 BLOB. The per-version replace runs delete + ordered
//! inserts inside a single transaction, so readers never observe an empty
//! version mid-replace. Similarity ranking decodes the stored BLOBs and
//! computes cosine similarity in Rust — a brute-force scan, which is fine
//! at the scale of one policy document.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{format_ts_iso, role_matches, ChunkStore, ScoredChunk};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{GovernanceChunk, SectionInfo, VersionInfo};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_roles(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_else(|_| vec![crate::tagger::ROLE_ALL.to_string()])
}

fn row_to_chunk(row: &SqliteRow) -> GovernanceChunk {
    let roles_json: String = row.get("roles_affected");
    let blob: Option<Vec<u8>> = row.get("embedding");

    GovernanceChunk {
        id: row.get("id"),
        version: row.get("version"),
        section: row.get("section"),
        heading_level: row.get("heading_level"),
        section_index: row.get("section_index"),
        content: row.get("content"),
        roles_affected: parse_roles(&roles_json),
        gate_type: row.get("gate_type"),
        embedding: blob.map(|b| blob_to_vec(&b)),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn replace_version(&self, version: &str, chunks: &[GovernanceChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM governance_chunks WHERE version = ?")
            .bind(version)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            let roles_json = serde_json::to_string(&chunk.roles_affected)?;
            let blob = chunk.embedding.as_deref().map(vec_to_blob);

            sqlx::query(
                r#"
                INSERT INTO governance_chunks
                    (id, version, section, heading_level, section_index,
                     content, roles_affected, gate_type, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.version)
            .bind(&chunk.section)
            .bind(chunk.heading_level)
            .bind(chunk.section_index)
            .bind(&chunk.content)
            .bind(&roles_json)
            .bind(&chunk.gate_type)
            .bind(blob)
            .bind(chunk.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_chunks(&self, version: Option<&str>) -> Result<Vec<GovernanceChunk>> {
        let rows = match version {
            Some(v) => {
                sqlx::query(
                    "SELECT * FROM governance_chunks WHERE version = ? ORDER BY section_index ASC",
                )
                .bind(v)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM governance_chunks ORDER BY section_index ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn list_sections(&self, version: Option<&str>) -> Result<Vec<SectionInfo>> {
        let query = r#"
            SELECT id, section, heading_level, section_index, version,
                   roles_affected, gate_type, updated_at,
                   (embedding IS NOT NULL) AS has_embedding
            FROM governance_chunks
        "#;

        let rows = match version {
            Some(v) => {
                sqlx::query(&format!(
                    "{} WHERE version = ? ORDER BY section_index ASC",
                    query
                ))
                .bind(v)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY section_index ASC", query))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| {
                let roles_json: String = row.get("roles_affected");
                SectionInfo {
                    id: row.get("id"),
                    section: row.get("section"),
                    heading_level: row.get("heading_level"),
                    section_index: row.get("section_index"),
                    version: row.get("version"),
                    roles_affected: parse_roles(&roles_json),
                    gate_type: row.get("gate_type"),
                    updated_at: format_ts_iso(row.get("updated_at")),
                    has_embedding: row.get("has_embedding"),
                }
            })
            .collect())
    }

    async fn latest_version(&self) -> Result<Option<VersionInfo>> {
        // rowid breaks same-second ties in favor of the newest ingestion.
        let latest = sqlx::query(
            "SELECT version, updated_at FROM governance_chunks \
             ORDER BY updated_at DESC, rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let row = match latest {
            Some(row) => row,
            None => return Ok(None),
        };
        let version: String = row.get("version");
        let updated_at: i64 = row.get("updated_at");

        let chunk_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM governance_chunks WHERE version = ?")
                .bind(&version)
                .fetch_one(&self.pool)
                .await?;

        let embedded_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM governance_chunks WHERE version = ? AND embedding IS NOT NULL",
        )
        .bind(&version)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(VersionInfo {
            version,
            updated_at: format_ts_iso(updated_at),
            chunk_count,
            embedded_count,
        }))
    }

    async fn embedded_count(&self, version: Option<&str>) -> Result<i64> {
        let count: i64 = match version {
            Some(v) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM governance_chunks WHERE version = ? AND embedding IS NOT NULL",
                )
                .bind(v)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM governance_chunks WHERE embedding IS NOT NULL",
                )
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }

    async fn similarity_search(
        &self,
        query_vec: &[f32],
        role: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT * FROM governance_chunks WHERE embedding IS NOT NULL ORDER BY section_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let mut chunk = row_to_chunk(row);
                if let Some(role) = role {
                    if !role_matches(&chunk.roles_affected, role) {
                        return None;
                    }
                }
                let vector = chunk.embedding.take()?;
                let score = cosine_similarity(query_vec, &vector) as f64;
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
