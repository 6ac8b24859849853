use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::models::assets::{AssetRowModel, NewAssetRowModel};

/// Replace a character's whole asset snapshot in one transaction.
/// Returns the number of rows written.
pub async fn replace_character_assets(
    pool: &SqlitePool,
    char_id: i64,
    rows: &[NewAssetRowModel],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM assets WHERE char_id = ?1")
        .bind(char_id)
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO assets (
                char_id, container_id, container_name, location_id, location_name,
                type_id, name, quantity, unit_price, extended_price, observed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(row.char_id)
        .bind(row.container_id)
        .bind(row.container_name.as_deref())
        .bind(row.location_id)
        .bind(&row.location_name)
        .bind(row.type_id)
        .bind(&row.name)
        .bind(row.quantity)
        .bind(row.unit_price.to_string())
        .bind(row.extended_price.to_string())
        .bind(row.observed_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Delete the snapshots of every character not listed in `keep`.
/// Returns the number of rows removed.
pub async fn delete_assets_except(pool: &SqlitePool, keep: &[i64]) -> Result<u64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM assets");
    if !keep.is_empty() {
        builder.push(" WHERE char_id NOT IN (");
        let mut separated = builder.separated(", ");
        for char_id in keep {
            separated.push_bind(*char_id);
        }
        separated.push_unseparated(")");
    }

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Fetch the persisted snapshot for a character in insertion order
pub async fn get_character_assets(
    pool: &SqlitePool,
    char_id: i64,
) -> Result<Vec<AssetRowModel>, sqlx::Error> {
    sqlx::query_as::<_, AssetRowModel>(
        r#"
        SELECT id, char_id, container_id, container_name, location_id, location_name,
               type_id, name, quantity, unit_price, extended_price, observed_at
        FROM assets
        WHERE char_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(char_id)
    .fetch_all(pool)
    .await
}
