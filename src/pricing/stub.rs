//! In-process market source for tests.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::eve_central_client::MarketStatSource;
use super::types::{FetchError, MarketStats};

#[derive(Debug, Default)]
pub struct StubMarket {
    prices: HashMap<i64, Decimal>,
    failing: HashSet<i64>,
    calls: AtomicUsize,
}

impl StubMarket {
    pub fn with_prices(prices: &[(i64, Decimal)]) -> Self {
        Self {
            prices: prices.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, type_id: i64) -> Self {
        self.failing.insert(type_id);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketStatSource for StubMarket {
    async fn fetch_buy_stats(&self, type_id: i64) -> Result<MarketStats, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&type_id) {
            return Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        let median = self
            .prices
            .get(&type_id)
            .copied()
            .ok_or_else(|| FetchError::Malformed(format!("no stub price for type {type_id}")))?;
        Ok(MarketStats { median, average: median, min: median, max: median })
    }
}
