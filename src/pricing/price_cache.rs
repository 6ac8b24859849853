use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::eve_central_client::MarketStatSource;
use super::types::{CachedPrice, PriceError};
use crate::config::DEFAULT_PRICE_TTL_SECS;
use crate::db::models::buy_prices::NewBuyPriceModel;
use crate::db::queries::buy_prices as buy_prices_queries;

/// Time-boxed cache of median buy prices in the `buy_prices` table.
///
/// A fresh row is served without touching the network. A missing or stale row
/// is refetched from the market source and upserted. When the refetch fails the
/// stale row is *not* served; the caller gets `PriceError::Unavailable`.
pub struct PriceCache<S> {
    pool: SqlitePool,
    source: S,
    ttl: chrono::Duration,
}

impl<S: MarketStatSource> PriceCache<S> {
    pub fn new(pool: SqlitePool, source: S, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_PRICE_TTL_SECS as i64));
        Self { pool, source, ttl }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn get_price(&self, type_id: i64) -> Result<Decimal, PriceError> {
        self.get_price_at(type_id, Utc::now()).await
    }

    /// Median buy price of `type_id` as seen at `now`.
    #[instrument(level = "debug", skip(self, now))]
    pub async fn get_price_at(&self, type_id: i64, now: DateTime<Utc>) -> Result<Decimal, PriceError> {
        let cached = self.cached(type_id).await?;

        if let Some(entry) = &cached {
            if entry.is_fresh(now, self.ttl) {
                debug!(type_id, median = %entry.median, "Price cache hit");
                return Ok(entry.median);
            }
        }

        let stats = match self.source.fetch_buy_stats(type_id).await {
            Ok(stats) => stats,
            Err(source) => {
                if let Some(stale) = &cached {
                    warn!(
                        type_id,
                        age_secs = (now - stale.fetched_at).num_seconds(),
                        error = %source,
                        "Price refetch failed, stale cached price is not served"
                    );
                }
                return Err(PriceError::Unavailable { type_id, source });
            }
        };

        let fresh = CachedPrice::new(type_id, stats, now);
        self.store(&fresh).await?;
        info!(
            type_id,
            median = %fresh.median,
            refreshed = cached.is_some(),
            "Cached fresh market price"
        );
        Ok(fresh.median)
    }

    /// The cached row for `type_id`, regardless of age.
    pub async fn cached(&self, type_id: i64) -> Result<Option<CachedPrice>, PriceError> {
        let Some(model) = buy_prices_queries::get_buy_price(&self.pool, type_id).await? else {
            return Ok(None);
        };

        match CachedPrice::try_from(model) {
            Ok(price) => Ok(Some(price)),
            Err(e) => {
                warn!(type_id, error = %e, "Unreadable cached price, treating as a miss");
                Ok(None)
            }
        }
    }

    /// Upsert a price row keyed by its `type_id`.
    pub async fn store(&self, price: &CachedPrice) -> Result<(), PriceError> {
        buy_prices_queries::upsert_buy_price(&self.pool, &NewBuyPriceModel::from(price)).await?;
        Ok(())
    }
}
