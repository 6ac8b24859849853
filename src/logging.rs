// Centralized logging setup: runtime log levels, optional JSON file logging, span timings on close
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock; // For global file guard
use eyre::{Result, eyre};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    EnvFilter,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init_logging(bin_name: String) -> Result<()> {
    // Load log levels for console and file from env
    let console_log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let file_log_level = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let log_to_file = env::var("LOG_TO_FILE").unwrap_or_else(|_| "false".to_string()) == "true";

    // Dependencies stay at "warn", the library and the running binary follow the configured level
    let env_filter_console = crate_filter(&bin_name, &console_log_level);
    let env_filter_file = crate_filter(&bin_name, &file_log_level);

    // Console layer: human-readable, reports span timings when spans close
    let console_layer = fmt::Layer::new()
        .pretty()
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter_console);

    if log_to_file {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let log_dir = Path::new("logs");
        fs::create_dir_all(log_dir)?;
        let log_file_name = format!("{}_{}.log", bin_name, timestamp);

        let file_appender = tracing_appender::rolling::never(log_dir, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD.set(guard).ok();

        // File layer: structured JSON logs with UTC timestamps
        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter_file);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    }

    tracing::debug!(bin = %bin_name, log_to_file, "Logging initialized");
    Ok(())
}

fn crate_filter(bin_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("warn,evetools={level},{bin_name}={level}"))
        .unwrap_or_else(|_| EnvFilter::new("warn,evetools=info"))
}
