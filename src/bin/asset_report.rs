use eyre::{Result, WrapErr};
use std::io::{self, Write};
use tracing::{info, instrument, warn};

use evetools::account::AccountSnapshot;
use evetools::config;
use evetools::db::db_manager::DbManager;
use evetools::logging;
use evetools::pricing::{EveCentralClient, PriceCache};
use evetools::reference::ReferenceResolver;
use evetools::report::console;
use evetools::valuation::{self, AssetValuator, PRICE_FAILURE_POLICY};

#[instrument(name = "asset_report_main")]
#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env if present)
    let cfg = config::Config::load()?;

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }
    info!(policy = PRICE_FAILURE_POLICY, "Configuration loaded and logging initialized");

    // Static names first: without them nothing can be reported
    let names = ReferenceResolver::connect(&cfg).await?;
    info!(path = %cfg.reference_database_path.display(), "Reference dataset opened");

    let db = DbManager::init(&cfg).await?;
    info!("Database manager initialized");

    let market = EveCentralClient::new(&cfg).wrap_err("Failed to build market HTTP client")?;
    let prices = PriceCache::new(db.pool.clone(), market, cfg.price_ttl);
    let valuator = AssetValuator::new(&prices, &names);

    let snapshot = AccountSnapshot::load_from_file(&cfg.account_snapshot_path)?;
    let summary = valuation::value_characters(&valuator, &db, &snapshot.characters).await;

    let mut out = io::stdout().lock();
    for (character, outcome) in snapshot.characters.iter().zip(&summary.outcomes) {
        console::render_character_header(&mut out, character)?;
        match &outcome.result {
            Ok(valuation) => console::render_valuation(&mut out, valuation)?,
            Err(e) => writeln!(out, "Valuation failed: {e}")?,
        }
    }
    console::render_summary(&mut out, &summary)?;
    out.flush()?;

    if summary.failed() > 0 {
        warn!(failed = summary.failed(), "Some characters could not be valued");
    }

    names.close().await;
    db.close().await;
    Ok(())
}
