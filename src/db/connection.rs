use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions,
    SqliteJournalMode,
    SqlitePool,
    SqlitePoolOptions,
};
use eyre::{Result, eyre};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::log::LevelFilter;

use crate::config::Config;

/// Opens (creating if needed) the local cache database.
///
/// A single connection keeps every `buy_prices` upsert on one writer.
pub async fn create_cache_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    ensure_parent_dir(&config.cache_database_url)?;

    let connect_options = SqliteConnectOptions::from_str(&config.cache_database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
}

/// Opens the static reference dataset read-only.
pub async fn create_reference_pool(config: &Config) -> Result<SqlitePool> {
    let path = &config.reference_database_path;
    if !path.exists() {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        return Err(eyre!(
            "Static reference database not found at {}. Download the latest static data dump \
             (e.g. {file_name}.bz2), decompress it and place it at that path, or point \
             REFERENCE_DATABASE_PATH at an existing copy.",
            path.display()
        ));
    }

    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(connect_options)
        .await?;
    Ok(pool)
}

/// Private in-memory database, kept alive for the lifetime of the pool.
pub async fn create_in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

fn ensure_parent_dir(database_url: &str) -> Result<(), sqlx::Error> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
