use chrono::{DateTime, Utc};
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{HistoryEntry, NewHistoryEntry};

pub async fn insert_history(
    payment_id: i64,
    entry: NewHistoryEntry,
    timestamp: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO payment_history (payment_id, timestamp, action, details) VALUES ($1, $2, $3, $4)")
        .bind(payment_id)
        .bind(timestamp)
        .bind(entry.action)
        .bind(Json(entry.details))
        .execute(conn)
        .await?;
    Ok(())
}

/// The history of a payment, oldest entry first.
pub async fn fetch_history(payment_id: i64, conn: &mut SqliteConnection) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    sqlx::query_as("SELECT timestamp, action, details FROM payment_history WHERE payment_id = $1 ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await
}
