use chrono::Utc;
use eyre::Result;
use std::io::{self, Write};
use tokio::time::interval;
use tracing::{error, info, instrument};

use evetools::account::AccountSnapshot;
use evetools::config::{self, Config};
use evetools::logging;
use evetools::reference::ReferenceResolver;
use evetools::report::console;

#[instrument(name = "status_report_main")]
#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env if present)
    let cfg = config::Config::load()?;

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }
    info!("Configuration loaded and logging initialized");

    let names = ReferenceResolver::connect(&cfg).await?;
    info!("Reference dataset opened");

    let Some(refresh) = cfg.status_refresh else {
        let result = print_status(&cfg, &names).await;
        names.close().await;
        return result;
    };

    // Reload the snapshot on every tick so updated exports are picked up
    let mut ticker = interval(refresh);
    info!(interval_secs = refresh.as_secs(), "Starting status refresh loop");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = print_status(&cfg, &names).await {
                    error!(error = %e, "Status refresh failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down status refresh loop");
                break;
            }
        }
    }

    names.close().await;
    Ok(())
}

async fn print_status(cfg: &Config, names: &ReferenceResolver) -> Result<()> {
    let snapshot = AccountSnapshot::load_from_file(&cfg.account_snapshot_path)?;
    let now = Utc::now();

    let mut buffer = Vec::new();
    for character in &snapshot.characters {
        console::render_status(&mut buffer, character, names, now).await?;
    }

    let mut out = io::stdout().lock();
    out.write_all(&buffer)?;
    out.flush()?;
    Ok(())
}
