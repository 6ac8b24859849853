pub mod eve_central_client;
pub mod price_cache;
pub mod types;

#[cfg(test)]
pub(crate) mod stub;

pub use eve_central_client::{EveCentralClient, MarketStatSource};
pub use price_cache::PriceCache;
pub use types::{CachedPrice, FetchError, MarketStats, PriceError};
