use eyre::{Result, WrapErr};
use sqlx::SqlitePool;

use super::connection;
use super::schema;
use super::queries::assets as assets_queries;
use super::models::assets::NewAssetRowModel;
use crate::config::Config;
use crate::valuation::AssetRow;

pub struct DbManager {
    pub pool: SqlitePool,
}

impl DbManager {
    /// Opens the cache database and initializes the schema
    pub async fn init(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = connection::create_cache_pool(config).await?;

        // Ensure schema is initialized (creates tables if needed)
        schema::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Wraps an already initialized pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Swap the stored snapshot for `char_id` with `rows`, all or nothing
    pub async fn replace_character_assets(
        &self,
        char_id: i64,
        rows: &[AssetRow],
    ) -> Result<u64, sqlx::Error> {
        let new_rows: Vec<NewAssetRowModel> = rows.iter().map(NewAssetRowModel::from).collect();
        assets_queries::replace_character_assets(&self.pool, char_id, &new_rows).await
    }

    /// Drop stored snapshots of characters that are no longer on the account
    pub async fn prune_characters_except(&self, char_ids: &[i64]) -> Result<u64, sqlx::Error> {
        assets_queries::delete_assets_except(&self.pool, char_ids).await
    }

    pub async fn character_assets(&self, char_id: i64) -> Result<Vec<AssetRow>> {
        let models = assets_queries::get_character_assets(&self.pool, char_id).await?;
        models
            .into_iter()
            .map(|model| {
                let id = model.id;
                AssetRow::try_from(model)
                    .wrap_err_with(|| format!("Stored asset row {id} has an unreadable price"))
            })
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
