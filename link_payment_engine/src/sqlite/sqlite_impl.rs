//! `SqliteDatabase` is the concrete SQLite backend of the payment engine.
//!
//! It implements every storage trait defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use lpg_common::PaymentStatus;
use sqlx::SqlitePool;

use super::db::{db_url, history, merchants, new_pool, payments, run_migrations, sessions, webhook_logs};
use crate::{
    db_types::{
        ActualOrder,
        MerchantConfig,
        NewHistoryEntry,
        NewMerchantConfig,
        NewPaymentRecord,
        NewWebhookLog,
        PaymentLinkDocument,
        PaymentRecord,
        PaymentUpdate,
        ReserveResult,
        ShopSession,
        WebhookLogEntry,
    },
    traits::{
        MerchantConfigError,
        MerchantManagement,
        PaymentRecordManagement,
        PaymentStoreError,
        SessionError,
        SessionManagement,
        WebhookLogError,
        WebhookLogManagement,
    },
};

const OPEN_STATUSES: [PaymentStatus; 2] = [PaymentStatus::Pending, PaymentStatus::Completed];

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `LPG_DATABASE_URL` for the connection.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Connects to the database at `url`, creating it if necessary, and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        run_migrations(&pool).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PaymentRecordManagement for SqliteDatabase {
    async fn find_by_shop_and_order(
        &self,
        shop: &str,
        order_id: &str,
        statuses: &[PaymentStatus],
    ) -> Result<Option<PaymentRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_by_shop_and_order(shop, order_id, statuses, &mut conn).await?;
        Ok(record)
    }

    async fn find_by_link_payment_id(&self, link_payment_id: &str) -> Result<Option<PaymentRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_by_link_payment_id(link_payment_id, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<PaymentRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_payment(id, &mut conn).await?;
        Ok(record)
    }

    async fn reserve_checkout(&self, record: NewPaymentRecord) -> Result<ReserveResult, PaymentStoreError> {
        let shop = record.shop.clone();
        let order_id = record.order_id.clone();
        // A competing reservation can be released between our insert and our lookup, so try twice.
        for _ in 0..2 {
            let mut tx = self.pool.begin().await?;
            match payments::insert_reservation(record.clone(), Utc::now(), &mut tx).await {
                Ok(reserved) => {
                    tx.commit().await?;
                    debug!("🗃️ Payment record #{} reserved for {shop}/{order_id}", reserved.id);
                    return Ok(ReserveResult::Reserved(reserved));
                },
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tx.rollback().await?;
                    let mut conn = self.pool.acquire().await?;
                    let existing = payments::fetch_by_shop_and_order(&shop, &order_id, &OPEN_STATUSES, &mut conn).await?;
                    if let Some(existing) = existing {
                        debug!("🗃️ {shop}/{order_id} already has open payment record #{}", existing.id);
                        return Ok(ReserveResult::AlreadyExists(existing));
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(PaymentStoreError::DatabaseError(format!("Could not reserve a payment record for {shop}/{order_id}")))
    }

    async fn upsert_by_link_payment_id(
        &self,
        reservation_id: i64,
        doc: PaymentLinkDocument,
    ) -> Result<PaymentRecord, PaymentStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let existing = payments::fetch_by_link_payment_id(&doc.link_payment_id, &mut tx).await?;
        let target = existing.map(|r| r.id).unwrap_or(reservation_id);
        let record = payments::attach_link(target, &doc, now, &mut tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(err) if err.is_unique_violation() => {
                    PaymentStoreError::LinkConflict(doc.link_payment_id.clone())
                },
                _ => PaymentStoreError::from(e),
            })?
            .ok_or(PaymentStoreError::RecordNotFound(target))?;
        if target != reservation_id {
            payments::delete_reservation(reservation_id, &mut tx).await?;
            debug!("🗃️ Link {} already belonged to record #{target}. Reservation dropped.", doc.link_payment_id);
        }
        history::insert_history(target, doc.history, now, &mut tx).await?;
        let record = payments::fetch_payment(record.id, &mut tx).await?.ok_or(PaymentStoreError::RecordNotFound(target))?;
        tx.commit().await?;
        debug!("🗃️ Payment record #{} now holds link {}", record.id, doc.link_payment_id);
        Ok(record)
    }

    async fn release_reservation(&self, id: i64) -> Result<bool, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let released = payments::delete_reservation(id, &mut tx).await?;
        tx.commit().await?;
        if released {
            debug!("🗃️ Reservation #{id} released");
        }
        Ok(released)
    }

    async fn append_history(&self, id: i64, entry: NewHistoryEntry) -> Result<(), PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        history::insert_history(id, entry, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn conditional_update_status(
        &self,
        id: i64,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentRecord>, PaymentStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let updated = payments::update_status_if_pending(id, &update, now, &mut tx).await?;
        let result = match updated {
            Some(_) => {
                history::insert_history(id, update.history, now, &mut tx).await?;
                payments::fetch_payment(id, &mut tx).await?
            },
            None => None,
        };
        tx.commit().await?;
        match &result {
            Some(r) => debug!("🗃️ Payment record #{id} is now {}", r.status),
            None => debug!("🗃️ Payment record #{id} is no longer pending. Update to {} skipped", update.status),
        }
        Ok(result)
    }

    async fn record_actual_order(
        &self,
        id: i64,
        order: ActualOrder,
        entry: NewHistoryEntry,
    ) -> Result<Option<PaymentRecord>, PaymentStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let result = match payments::set_actual_order(id, &order, now, &mut tx).await? {
            Some(_) => {
                history::insert_history(id, entry, now, &mut tx).await?;
                payments::fetch_payment(id, &mut tx).await?
            },
            None => None,
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let records = payments::fetch_stale_pending(older_than, limit, &mut conn).await?;
        Ok(records)
    }
}

impl WebhookLogManagement for SqliteDatabase {
    async fn insert_webhook_log(&self, entry: NewWebhookLog) -> Result<WebhookLogEntry, WebhookLogError> {
        let mut tx = self.pool.begin().await?;
        let entry = webhook_logs::insert_log(entry, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Webhook log #{} ({}) saved", entry.id, entry.event);
        Ok(entry)
    }

    async fn mark_webhook_processed(
        &self,
        id: i64,
        shop: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), WebhookLogError> {
        let mut tx = self.pool.begin().await?;
        webhook_logs::set_outcome(id, true, shop, error, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_webhook_failed(&self, id: i64, shop: Option<&str>, error: &str) -> Result<(), WebhookLogError> {
        let mut tx = self.pool.begin().await?;
        webhook_logs::set_outcome(id, false, shop, Some(error), &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_webhook_log(&self, id: i64) -> Result<Option<WebhookLogEntry>, WebhookLogError> {
        let mut conn = self.pool.acquire().await?;
        let entry = webhook_logs::fetch_log(id, &mut conn).await?;
        Ok(entry)
    }
}

impl MerchantManagement for SqliteDatabase {
    async fn fetch_merchant_config(&self, shop: &str) -> Result<Option<MerchantConfig>, MerchantConfigError> {
        let mut conn = self.pool.acquire().await?;
        let config = merchants::fetch_config(shop, &mut conn).await?;
        Ok(config)
    }

    async fn upsert_merchant_config(&self, config: NewMerchantConfig) -> Result<MerchantConfig, MerchantConfigError> {
        config.validate()?;
        let mut tx = self.pool.begin().await?;
        let config = merchants::upsert_config(config, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Merchant configuration for {} saved", config.shop);
        Ok(config)
    }
}

impl SessionManagement for SqliteDatabase {
    async fn fetch_offline_session(&self, shop: &str) -> Result<Option<ShopSession>, SessionError> {
        let mut conn = self.pool.acquire().await?;
        let session = sessions::fetch_offline_session(shop, &mut conn).await?;
        Ok(session)
    }

    async fn save_session(&self, session: ShopSession) -> Result<(), SessionError> {
        let mut tx = self.pool.begin().await?;
        sessions::save_session(session, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_sessions_for_shop(&self, shop: &str) -> Result<u64, SessionError> {
        let mut tx = self.pool.begin().await?;
        let count = sessions::delete_for_shop(shop, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ {count} sessions deleted for {shop}");
        Ok(count)
    }

    async fn update_session_scope(&self, session_id: &str, scope: &str) -> Result<bool, SessionError> {
        let mut tx = self.pool.begin().await?;
        let updated = sessions::update_scope(session_id, scope, &mut tx).await?;
        tx.commit().await?;
        Ok(updated)
    }
}
