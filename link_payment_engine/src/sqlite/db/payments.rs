use chrono::{DateTime, Utc};
use log::*;
use lpg_common::PaymentStatus;
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::history;
use crate::db_types::{ActualOrder, NewPaymentRecord, PaymentLinkDocument, PaymentRecord, PaymentUpdate};

/// Fills in the history of a record that has just been read from the `payments` table.
async fn with_history(
    record: Option<PaymentRecord>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    match record {
        Some(mut record) => {
            record.payment_history = history::fetch_history(record.id, conn).await?;
            Ok(Some(record))
        },
        None => Ok(None),
    }
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    with_history(record, conn).await
}

pub async fn fetch_by_link_payment_id(
    link_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM payments WHERE link_payment_id = $1")
        .bind(link_payment_id)
        .fetch_optional(&mut *conn)
        .await?;
    with_history(record, conn).await
}

/// The most recently created record for the order whose status is in `statuses`. An empty status list matches any
/// status.
pub async fn fetch_by_shop_and_order(
    shop: &str,
    order_id: &str,
    statuses: &[PaymentStatus],
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM payments WHERE shop = ");
    builder.push_bind(shop);
    builder.push(" AND order_id = ");
    builder.push_bind(order_id);
    if !statuses.is_empty() {
        builder.push(" AND status IN (");
        let mut list = builder.separated(", ");
        for status in statuses {
            list.push_bind(*status);
        }
        list.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT 1");
    let record = builder.build_query_as::<PaymentRecord>().fetch_optional(&mut *conn).await?;
    with_history(record, conn).await
}

/// Inserts a new `pending` reservation. Fails with a unique violation if the order already has an open record.
pub async fn insert_reservation(
    record: NewPaymentRecord,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, sqlx::Error> {
    let record: PaymentRecord = sqlx::query_as(
        r#"INSERT INTO payments (shop, order_id, order_name, amount, currency, status, order_details, created_at,
        updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $7)
        RETURNING *"#,
    )
    .bind(record.shop)
    .bind(record.order_id)
    .bind(record.order_name)
    .bind(record.amount)
    .bind(record.currency)
    .bind(record.order_details.map(Json))
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    trace!("🗃️ Reserved payment record #{} for order {}", record.id, record.order_id);
    Ok(record)
}

/// Writes link and draft order details onto a record. Fields that already hold a value keep it.
pub async fn attach_link(
    id: i64,
    doc: &PaymentLinkDocument,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let draft_id = doc.draft_order.as_ref().map(|d| d.draft_order_id.clone());
    let draft_url = doc.draft_order.as_ref().and_then(|d| d.draft_order_url.clone());
    sqlx::query_as(
        r#"UPDATE payments SET
            link_payment_id = COALESCE(link_payment_id, $1),
            link_payment_url = COALESCE(link_payment_url, $2),
            draft_order_created_at = CASE
                WHEN draft_order_id IS NULL AND $3 IS NOT NULL THEN $5
                ELSE draft_order_created_at END,
            draft_order_id = COALESCE(draft_order_id, $3),
            draft_order_url = COALESCE(draft_order_url, $4),
            updated_at = $5
        WHERE id = $6
        RETURNING *"#,
    )
    .bind(&doc.link_payment_id)
    .bind(&doc.link_payment_url)
    .bind(draft_id)
    .bind(draft_url)
    .bind(now)
    .bind(id)
    .fetch_all(conn)
    .await
    .map(|mut rows| rows.pop())
}

/// Deletes a reservation, provided it has not been given a processor link yet.
pub async fn delete_reservation(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND link_payment_id IS NULL")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves a `pending` record to a new status.
///
/// * The ledger hash is only replaced by a non-null value.
/// * The confirmation count never decreases.
/// * `paid_at` is written once.
///
/// Returns `None` if the record is no longer `pending`.
pub async fn update_status_if_pending(
    id: i64,
    update: &PaymentUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE payments SET
            status = $1,
            xrpl_tx_hash = COALESCE($2, xrpl_tx_hash),
            xrpl_confirmations = CASE
                WHEN $3 IS NOT NULL AND (xrpl_confirmations IS NULL OR $3 > xrpl_confirmations) THEN $3
                ELSE xrpl_confirmations END,
            paid_at = COALESCE(paid_at, $4),
            updated_at = $5
        WHERE id = $6 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(update.status)
    .bind(update.xrpl_tx_hash.as_deref())
    .bind(update.xrpl_confirmations)
    .bind(update.paid_at)
    .bind(now)
    .bind(id)
    .fetch_all(conn)
    .await
    .map(|mut rows| rows.pop())
}

/// Records the order that finalised a completed payment. Only the first order recorded is kept.
pub async fn set_actual_order(
    id: i64,
    order: &ActualOrder,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE payments SET
            actual_order_id = COALESCE(actual_order_id, $1),
            actual_order_name = COALESCE(actual_order_name, $2),
            actual_order_created_at = COALESCE(actual_order_created_at, $3),
            updated_at = $3
        WHERE id = $4 AND status = 'completed'
        RETURNING *"#,
    )
    .bind(&order.order_id)
    .bind(&order.order_name)
    .bind(now)
    .bind(id)
    .fetch_all(conn)
    .await
    .map(|mut rows| rows.pop())
}

pub async fn fetch_stale_pending(
    older_than: DateTime<Utc>,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT * FROM payments
        WHERE status = 'pending' AND link_payment_id IS NOT NULL AND julianday(created_at) < julianday($1)
        ORDER BY created_at ASC
        LIMIT $2"#,
    )
    .bind(older_than)
    .bind(limit)
    .fetch_all(conn)
    .await
}
