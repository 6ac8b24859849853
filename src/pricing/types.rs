use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::db::models::buy_prices::BuyPriceModel;

/// Buy-side statistics for one item type, as reported by the market service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStats {
    pub median: Decimal,
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Last-known market price of one item type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPrice {
    pub type_id: i64,
    pub median: Decimal,
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPrice {
    pub fn new(type_id: i64, stats: MarketStats, fetched_at: DateTime<Utc>) -> Self {
        Self {
            type_id,
            median: stats.median,
            average: stats.average,
            min: stats.min,
            max: stats.max,
            fetched_at,
        }
    }

    /// True while `now - fetched_at` is strictly below the freshness window
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

impl TryFrom<BuyPriceModel> for CachedPrice {
    type Error = rust_decimal::Error;

    fn try_from(model: BuyPriceModel) -> Result<Self, Self::Error> {
        Ok(Self {
            type_id: model.type_id,
            median: Decimal::from_str(&model.median)?,
            average: Decimal::from_str(&model.avg)?,
            min: Decimal::from_str(&model.min)?,
            max: Decimal::from_str(&model.max)?,
            fetched_at: model.timestamp,
        })
    }
}

/// Why a remote price fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http request error: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("unexpected response status {0}")]
    Status(StatusCode),
    #[error("malformed market stat response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(reqwest_middleware::Error::Reqwest(error))
        }
    }
}

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price unavailable for type {type_id}: {source}")]
    Unavailable {
        type_id: i64,
        #[source]
        source: FetchError,
    },
    #[error("price cache storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
