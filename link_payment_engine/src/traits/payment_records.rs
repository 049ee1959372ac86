use chrono::{DateTime, Utc};
use lpg_common::PaymentStatus;
use thiserror::Error;

use crate::db_types::{
    ActualOrder,
    NewHistoryEntry,
    NewPaymentRecord,
    PaymentLinkDocument,
    PaymentRecord,
    PaymentUpdate,
    ReserveResult,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment record {0} does not exist")]
    RecordNotFound(i64),
    #[error("Payment link {0} is already attached to another order")]
    LinkConflict(String),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for payment records.
///
/// Implementations must guarantee that at most one record per `(shop, order_id)` is `pending` or `completed` at any
/// time, that `link_payment_id` is unique, and that status transitions only ever leave `pending`.
#[allow(async_fn_in_trait)]
pub trait PaymentRecordManagement {
    /// Returns the most recent record for the order whose status is one of `statuses`.
    async fn find_by_shop_and_order(
        &self,
        shop: &str,
        order_id: &str,
        statuses: &[PaymentStatus],
    ) -> Result<Option<PaymentRecord>, PaymentStoreError>;

    /// Looks a record up by its processor payment id. History is included.
    async fn find_by_link_payment_id(&self, link_payment_id: &str) -> Result<Option<PaymentRecord>, PaymentStoreError>;

    async fn fetch_payment(&self, id: i64) -> Result<Option<PaymentRecord>, PaymentStoreError>;

    /// Atomically claims the `(shop, order_id)` slot with a new `pending` record. If an open record already exists,
    /// it is returned as [`ReserveResult::AlreadyExists`] instead.
    async fn reserve_checkout(&self, record: NewPaymentRecord) -> Result<ReserveResult, PaymentStoreError>;

    /// Attaches processor link and draft details to the reservation. If a record with the same `link_payment_id`
    /// already exists, that record is updated instead (set-once fields only) and the reservation is discarded.
    async fn upsert_by_link_payment_id(
        &self,
        reservation_id: i64,
        doc: PaymentLinkDocument,
    ) -> Result<PaymentRecord, PaymentStoreError>;

    /// Deletes a reservation that never received a processor link. Records with a link are left untouched.
    async fn release_reservation(&self, id: i64) -> Result<bool, PaymentStoreError>;

    async fn append_history(&self, id: i64, entry: NewHistoryEntry) -> Result<(), PaymentStoreError>;

    /// Applies `update` only if the record is still `pending`. Returns the updated record, or `None` if another
    /// writer got there first.
    async fn conditional_update_status(
        &self,
        id: i64,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentRecord>, PaymentStoreError>;

    /// Stores the order that finalised a completed payment. The order fields are set once.
    async fn record_actual_order(
        &self,
        id: i64,
        order: ActualOrder,
        entry: NewHistoryEntry,
    ) -> Result<Option<PaymentRecord>, PaymentStoreError>;

    /// Pending records with a processor link that were created before `older_than`, oldest first.
    async fn fetch_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, PaymentStoreError>;
}
