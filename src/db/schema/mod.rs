use sqlx::{
    Executor,
    sqlite::SqlitePool,
};

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("buy_prices.sql")).await?;
    pool.execute(include_str!("assets.sql")).await?;

    // Snapshots are always read and replaced per character
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_assets_char_id
        ON assets(char_id);
        "#
    )
    .execute(pool)
    .await?;

    Ok(())
}
