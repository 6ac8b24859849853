use dotenvy::dotenv;
use eyre::{Result, WrapErr, eyre};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_CACHE_DATABASE_URL: &str = "sqlite://db/evetools.db";
const DEFAULT_REFERENCE_DATABASE_PATH: &str = "db/rub112-sqlite3-v1.db";
const DEFAULT_MARKET_STAT_URL: &str = "http://api.eve-central.com/api/marketstat";
const DEFAULT_ACCOUNT_SNAPSHOT_PATH: &str = "data/account.json";

/// Freshness window for cached market prices.
pub const DEFAULT_PRICE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_database_url: String,
    pub reference_database_path: PathBuf,
    pub market_stat_url: Url,
    pub account_snapshot_path: PathBuf,
    pub price_ttl: Duration,
    pub http_timeout: Duration,
    pub http_max_retries: u32,
    pub market_requests_per_second: u32,
    pub status_refresh: Option<Duration>, // None = print once and exit
}

impl Config {
    /// Loads `.env` (if present) and builds the config from the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let market_stat_url = get("MARKET_STAT_URL", DEFAULT_MARKET_STAT_URL);
        let market_stat_url = Url::parse(&market_stat_url)
            .wrap_err_with(|| format!("Invalid MARKET_STAT_URL: {market_stat_url}"))?;

        let price_ttl_secs: u64 = parse_var(&lookup, "PRICE_TTL_SECS", DEFAULT_PRICE_TTL_SECS)?;
        let http_timeout_secs: u64 = parse_var(&lookup, "HTTP_TIMEOUT_SECS", 10)?;
        let http_max_retries: u32 = parse_var(&lookup, "HTTP_MAX_RETRIES", 3)?;
        let market_requests_per_second: u32 = parse_var(&lookup, "MARKET_REQUESTS_PER_SECOND", 5)?;
        if market_requests_per_second == 0 {
            return Err(eyre!("MARKET_REQUESTS_PER_SECOND must be greater than zero"));
        }

        let status_refresh = match lookup("STATUS_REFRESH_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .wrap_err_with(|| format!("Invalid STATUS_REFRESH_SECS: {raw}"))?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Config {
            cache_database_url: get("CACHE_DATABASE_URL", DEFAULT_CACHE_DATABASE_URL),
            reference_database_path: PathBuf::from(get(
                "REFERENCE_DATABASE_PATH",
                DEFAULT_REFERENCE_DATABASE_PATH,
            )),
            market_stat_url,
            account_snapshot_path: PathBuf::from(get(
                "ACCOUNT_SNAPSHOT_PATH",
                DEFAULT_ACCOUNT_SNAPSHOT_PATH,
            )),
            price_ttl: Duration::from_secs(price_ttl_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            http_max_retries,
            market_requests_per_second,
            status_refresh,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {key}: {raw}")),
        None => Ok(default),
    }
}
