use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, instrument};

use super::tree::{AssetTreeError, CharacterAssets};
use crate::db::models::assets::AssetRowModel;
use crate::pricing::{MarketStatSource, PriceCache, PriceError};
use crate::reference::ReferenceResolver;

/// How a missing price is handled: the character's whole valuation is aborted.
/// Rows are never priced at zero and never skipped.
pub const PRICE_FAILURE_POLICY: &str = "abort-character";

/// One valued line of a character's inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    pub char_id: i64,
    pub container_id: Option<i64>,
    pub container_name: Option<String>,
    pub location_id: i64,
    pub location_name: String,
    pub type_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub extended_price: Decimal, // quantity * unit_price
    pub observed_at: DateTime<Utc>,
}

impl TryFrom<AssetRowModel> for AssetRow {
    type Error = rust_decimal::Error;

    fn try_from(model: AssetRowModel) -> Result<Self, Self::Error> {
        Ok(Self {
            char_id: model.char_id,
            container_id: model.container_id,
            container_name: model.container_name,
            location_id: model.location_id,
            location_name: model.location_name,
            type_id: model.type_id,
            name: model.name,
            quantity: model.quantity,
            unit_price: Decimal::from_str(&model.unit_price)?,
            extended_price: Decimal::from_str(&model.extended_price)?,
            observed_at: model.observed_at,
        })
    }
}

/// Result of valuing one character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    pub char_id: i64,
    pub grand_total: Decimal,
    pub rows: Vec<AssetRow>,
}

impl Valuation {
    #[cfg(test)]
    pub fn rows_total(&self) -> Decimal {
        self.rows.iter().map(|row| row.extended_price).sum()
    }
}

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("malformed asset tree: {0}")]
    MalformedAssetTree(#[from] AssetTreeError),
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error("reference lookup failed: {0}")]
    Reference(#[source] sqlx::Error),
    #[error("value of {quantity} x type {type_id} overflows")]
    Overflow { type_id: i64, quantity: i64 },
    #[error("asset total of character {char_id} overflows")]
    TotalOverflow { char_id: i64 },
    #[error("snapshot storage failed: {0}")]
    Storage(#[source] sqlx::Error),
}

/// Walks an asset tree, pricing every line through the price cache and naming
/// it through the reference resolver.
pub struct AssetValuator<'a, S> {
    prices: &'a PriceCache<S>,
    names: &'a ReferenceResolver,
}

struct Line<'l> {
    location_id: i64,
    location_name: &'l str,
    container: Option<(i64, &'l str)>,
    type_id: i64,
    quantity: i64,
}

impl<'a, S: MarketStatSource> AssetValuator<'a, S> {
    pub fn new(prices: &'a PriceCache<S>, names: &'a ReferenceResolver) -> Self {
        Self { prices, names }
    }

    #[instrument(skip(self, assets), fields(lines = assets.line_count()))]
    pub async fn value_assets(
        &self,
        char_id: i64,
        assets: &CharacterAssets,
    ) -> Result<Valuation, ValuationError> {
        info!(char_id, policy = PRICE_FAILURE_POLICY, "Valuing character assets");
        let observed_at = Utc::now();

        let mut rows = Vec::with_capacity(assets.line_count());
        let mut grand_total = Decimal::ZERO;

        for location in &assets.locations {
            let location_name = self.name_of_station(location.id).await?;

            for item in &location.items {
                let row = self
                    .value_line(
                        char_id,
                        observed_at,
                        Line {
                            location_id: location.id,
                            location_name: &location_name,
                            container: None,
                            type_id: item.type_id,
                            quantity: item.quantity,
                        },
                    )
                    .await?;
                grand_total = add_to_total(char_id, grand_total, row.extended_price)?;
                let container_name = row.name.clone();
                rows.push(row);

                for sub_item in &item.contents {
                    let row = self
                        .value_line(
                            char_id,
                            observed_at,
                            Line {
                                location_id: location.id,
                                location_name: &location_name,
                                container: Some((item.type_id, &container_name)),
                                type_id: sub_item.type_id,
                                quantity: sub_item.quantity,
                            },
                        )
                        .await?;
                    grand_total = add_to_total(char_id, grand_total, row.extended_price)?;
                    rows.push(row);
                }
            }
        }

        info!(char_id, rows = rows.len(), grand_total = %grand_total, "Character assets valued");
        Ok(Valuation { char_id, grand_total, rows })
    }

    async fn value_line(
        &self,
        char_id: i64,
        observed_at: DateTime<Utc>,
        line: Line<'_>,
    ) -> Result<AssetRow, ValuationError> {
        let unit_price = self.prices.get_price(line.type_id).await?;
        let extended_price = Decimal::from(line.quantity)
            .checked_mul(unit_price)
            .ok_or(ValuationError::Overflow { type_id: line.type_id, quantity: line.quantity })?;
        let name = self
            .names
            .type_name(line.type_id)
            .await
            .map_err(ValuationError::Reference)?;

        Ok(AssetRow {
            char_id,
            container_id: line.container.map(|(id, _)| id),
            container_name: line.container.map(|(_, name)| name.to_string()),
            location_id: line.location_id,
            location_name: line.location_name.to_string(),
            type_id: line.type_id,
            name,
            quantity: line.quantity,
            unit_price,
            extended_price,
            observed_at,
        })
    }

    async fn name_of_station(&self, location_id: i64) -> Result<String, ValuationError> {
        self.names
            .station_name(location_id)
            .await
            .map_err(ValuationError::Reference)
    }
}

fn add_to_total(char_id: i64, total: Decimal, amount: Decimal) -> Result<Decimal, ValuationError> {
    total
        .checked_add(amount)
        .ok_or(ValuationError::TotalOverflow { char_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connection, schema};
    use crate::pricing::stub::StubMarket;
    use crate::reference::fixtures;
    use rust_decimal::dec;
    use serde_json::json;
    use std::time::Duration;

    async fn price_cache(market: StubMarket) -> PriceCache<StubMarket> {
        let pool = connection::create_in_memory_pool().await.unwrap();
        schema::init_schema(&pool).await.unwrap();
        PriceCache::new(pool, market, Duration::from_secs(3600))
    }

    async fn resolver() -> ReferenceResolver {
        ReferenceResolver::new(
            fixtures::reference_pool(
                &[(100, "Cargo Container"), (200, "Tritanium"), (300, "Pyerite")],
                &[(60003760, "Jita IV - Moon 4")],
                &[],
            )
            .await,
        )
    }

    fn container_tree() -> CharacterAssets {
        CharacterAssets::from_json(&json!({
            "1": { "location_id": 60003760, "contents": [
                { "item_type_id": 100, "quantity": 5, "contents": [
                    { "item_type_id": 200, "quantity": 2 }
                ]}
            ]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_container_with_sub_item() {
        let prices = price_cache(StubMarket::with_prices(&[(100, dec!(10.0)), (200, dec!(3.5))])).await;
        let names = resolver().await;
        let valuator = AssetValuator::new(&prices, &names);

        let valuation = valuator.value_assets(90000001, &container_tree()).await.unwrap();

        assert_eq!(valuation.grand_total, dec!(57.0));
        assert_eq!(valuation.rows.len(), 2);

        let container = &valuation.rows[0];
        assert_eq!(container.type_id, 100);
        assert_eq!(container.container_id, None);
        assert_eq!(container.quantity, 5);
        assert_eq!(container.extended_price, dec!(50.0));
        assert_eq!(container.name, "Cargo Container");
        assert_eq!(container.location_name, "Jita IV - Moon 4");

        let sub_item = &valuation.rows[1];
        assert_eq!(sub_item.type_id, 200);
        assert_eq!(sub_item.container_id, Some(100));
        assert_eq!(sub_item.container_name.as_deref(), Some("Cargo Container"));
        assert_eq!(sub_item.quantity, 2);
        assert_eq!(sub_item.extended_price, dec!(7.0));
    }

    #[tokio::test]
    async fn test_grand_total_matches_rows() {
        let prices = price_cache(StubMarket::with_prices(&[
            (100, dec!(1234.56)),
            (200, dec!(0.01)),
            (300, dec!(7.333)),
        ]))
        .await;
        let names = resolver().await;
        let assets = CharacterAssets::from_json(&json!({
            "a": { "location_id": 60003760, "contents": [
                { "item_type_id": 300, "quantity": 3 },
                { "item_type_id": 100, "quantity": 2, "contents": [
                    { "item_type_id": 200, "quantity": 999999 },
                    { "item_type_id": 300, "quantity": 1 }
                ]}
            ]},
            "b": { "location_id": 42, "contents": [
                { "item_type_id": 200, "quantity": 7 }
            ]}
        }))
        .unwrap();

        let valuation = AssetValuator::new(&prices, &names)
            .value_assets(1, &assets)
            .await
            .unwrap();

        assert_eq!(valuation.rows.len(), 5);
        assert_eq!(valuation.grand_total, valuation.rows_total());
        assert_eq!(valuation.grand_total, dec!(12498.512));
        // Unknown station still yields rows
        assert_eq!(valuation.rows[4].location_name, "Unknown(42)");
        // Each type is fetched once per run
        assert_eq!(prices.source().calls(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_price_aborts_character() {
        let prices = price_cache(StubMarket::with_prices(&[(100, dec!(10.0))]).failing(200)).await;
        let names = resolver().await;

        let error = AssetValuator::new(&prices, &names)
            .value_assets(1, &container_tree())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ValuationError::Price(PriceError::Unavailable { type_id: 200, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_tree_values_to_zero() {
        let prices = price_cache(StubMarket::default()).await;
        let names = resolver().await;

        let valuation = AssetValuator::new(&prices, &names)
            .value_assets(1, &CharacterAssets::default())
            .await
            .unwrap();

        assert!(valuation.rows.is_empty());
        assert_eq!(valuation.grand_total, Decimal::ZERO);
        assert_eq!(prices.source().calls(), 0);
    }

    #[tokio::test]
    async fn test_total_overflow_is_an_error() {
        let prices = price_cache(StubMarket::with_prices(&[(200, dec!(50000000000))])).await;
        let names = resolver().await;
        let assets = CharacterAssets::from_json(&json!({
            "1": { "location_id": 60003760, "contents": [
                { "item_type_id": 200, "quantity": 1_000_000_000_000_000_000i64 },
                { "item_type_id": 200, "quantity": 1_000_000_000_000_000_000i64 }
            ]}
        }))
        .unwrap();

        let error = AssetValuator::new(&prices, &names)
            .value_assets(7, &assets)
            .await
            .unwrap_err();

        assert!(matches!(error, ValuationError::TotalOverflow { char_id: 7 }));
    }
}
