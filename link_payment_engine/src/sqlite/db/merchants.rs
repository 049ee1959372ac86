use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{MerchantConfig, NewMerchantConfig};

pub async fn fetch_config(shop: &str, conn: &mut SqliteConnection) -> Result<Option<MerchantConfig>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchant_configs WHERE shop = $1").bind(shop).fetch_optional(conn).await
}

pub async fn upsert_config(
    config: NewMerchantConfig,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<MerchantConfig, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO merchant_configs (shop, link_business_id, xrpl_address, enabled, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        ON CONFLICT (shop) DO UPDATE SET
            link_business_id = excluded.link_business_id,
            xrpl_address = excluded.xrpl_address,
            enabled = excluded.enabled,
            updated_at = excluded.updated_at
        RETURNING *"#,
    )
    .bind(config.shop)
    .bind(config.link_business_id.trim())
    .bind(config.xrpl_address.trim())
    .bind(config.enabled)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)
}
