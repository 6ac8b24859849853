use sqlx::SqlitePool;

use crate::db::models::buy_prices::{BuyPriceModel, NewBuyPriceModel};

/// Fetch the cached price row for a type, if any
pub async fn get_buy_price(
    pool: &SqlitePool,
    type_id: i64,
) -> Result<Option<BuyPriceModel>, sqlx::Error> {
    sqlx::query_as::<_, BuyPriceModel>(
        r#"
        SELECT type_id, median, avg, min, max, timestamp
        FROM buy_prices
        WHERE type_id = ?1
        "#,
    )
    .bind(type_id)
    .fetch_optional(pool)
    .await
}

/// Insert or overwrite the cached price for a type (one row per type_id)
pub async fn upsert_buy_price(
    pool: &SqlitePool,
    price: &NewBuyPriceModel,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO buy_prices (type_id, median, avg, min, max, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(type_id) DO UPDATE SET
            median = excluded.median,
            avg = excluded.avg,
            min = excluded.min,
            max = excluded.max,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(price.type_id)
    .bind(price.median.to_string())
    .bind(price.avg.to_string())
    .bind(price.min.to_string())
    .bind(price.max.to_string())
    .bind(price.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of cached rows for a type (0 or 1)
#[cfg(test)]
pub async fn count_buy_prices(pool: &SqlitePool, type_id: i64) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM buy_prices WHERE type_id = ?1")
        .bind(type_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
