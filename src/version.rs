//! Current governance version overview.
//!
//! Reports the most recently updated version label, its timestamp, and
//! embedding coverage — a quick check that ingestions landed and whether
//! they ran embedded or degraded.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::sqlite::SqliteStore;
use crate::store::ChunkStore;

pub async fn run_version(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    match store.latest_version().await? {
        None => println!("No governance document ingested yet"),
        Some(info) => {
            let pct = if info.chunk_count > 0 {
                (info.embedded_count * 100) / info.chunk_count
            } else {
                0
            };
            println!("governance version");
            println!("  version: {}", info.version);
            println!("  updated: {}", info.updated_at);
            println!("  chunks: {}", info.chunk_count);
            println!(
                "  embedded: {} / {} ({}%)",
                info.embedded_count, info.chunk_count, pct
            );
        }
    }

    store.pool().close().await;
    Ok(())
}
