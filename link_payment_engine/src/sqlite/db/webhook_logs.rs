use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewWebhookLog, WebhookLogEntry};

pub async fn insert_log(
    entry: NewWebhookLog,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<WebhookLogEntry, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO webhook_logs (event, payload, processed, error, shop, link_payment_id, created_at)
        VALUES ($1, $2, FALSE, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(entry.event)
    .bind(entry.payload)
    .bind(entry.error)
    .bind(entry.shop)
    .bind(entry.link_payment_id)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)
}

/// Sets the outcome of a log entry. A `shop` that was already recorded is kept.
pub async fn set_outcome(
    id: i64,
    processed: bool,
    shop: Option<&str>,
    error: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE webhook_logs SET processed = $1, shop = COALESCE(shop, $2), error = $3 WHERE id = $4")
        .bind(processed)
        .bind(shop)
        .bind(error)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_log(id: i64, conn: &mut SqliteConnection) -> Result<Option<WebhookLogEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM webhook_logs WHERE id = $1").bind(id).fetch_optional(conn).await
}
