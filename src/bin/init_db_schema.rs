use eyre::Result;
use tracing::info;

use evetools::config;
use evetools::db::{
    connection,
    schema,
};
use evetools::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env if present)
    let cfg = config::Config::load()?;

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }
    info!(database = %cfg.cache_database_url, "Configuration loaded and logging initialized");

    // Open (or create) the cache database
    let pool = connection::create_cache_pool(&cfg).await?;
    info!("Database connection pool created");

    // Initialize database schema
    schema::init_schema(&pool).await?;
    info!("Database schema initialized");

    pool.close().await;
    Ok(())
}
