use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::valuation::AssetRow;

#[derive(Debug, Clone, FromRow)]
pub struct AssetRowModel {
    pub id: i64,
    pub char_id: i64,
    pub container_id: Option<i64>,
    pub container_name: Option<String>,
    pub location_id: i64,
    pub location_name: String,
    pub type_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub extended_price: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssetRowModel {
    pub char_id: i64,
    pub container_id: Option<i64>,
    pub container_name: Option<String>,
    pub location_id: i64,
    pub location_name: String,
    pub type_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub extended_price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl From<&AssetRow> for NewAssetRowModel {
    fn from(row: &AssetRow) -> Self {
        Self {
            char_id: row.char_id,
            container_id: row.container_id,
            container_name: row.container_name.clone(),
            location_id: row.location_id,
            location_name: row.location_name.clone(),
            type_id: row.type_id,
            name: row.name.clone(),
            quantity: row.quantity,
            unit_price: row.unit_price,
            extended_price: row.extended_price,
            observed_at: row.observed_at,
        }
    }
}
