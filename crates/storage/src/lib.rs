//! Storage layer: SQLite schema and document persistence.
//!
//! Holds DB pool setup, the migration runner and the document queries. The
//! `documents.content_hash` column is UNIQUE; that constraint is what makes
//! [`documents::insert_unique`] safe against racing uploads.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod documents;
pub mod models;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}", norm);
        }
    }
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        // Every connection to `:memory:` is its own database.
        opts = opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect_with(options).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
