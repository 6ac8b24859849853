use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::pricing::types::CachedPrice;

// Decimals are stored as TEXT so no precision is lost in SQLite
#[derive(Debug, Clone, FromRow)]
pub struct BuyPriceModel {
    pub type_id: i64,
    pub median: String,
    pub avg: String,
    pub min: String,
    pub max: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBuyPriceModel {
    pub type_id: i64,
    pub median: Decimal,
    pub avg: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl From<&CachedPrice> for NewBuyPriceModel {
    fn from(price: &CachedPrice) -> Self {
        Self {
            type_id: price.type_id,
            median: price.median,
            avg: price.average,
            min: price.min,
            max: price.max,
            timestamp: price.fetched_at,
        }
    }
}
