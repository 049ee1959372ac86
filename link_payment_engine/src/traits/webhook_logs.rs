use thiserror::Error;

use crate::db_types::{NewWebhookLog, WebhookLogEntry};

#[derive(Debug, Clone, Error)]
pub enum WebhookLogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for WebhookLogError {
    fn from(e: sqlx::Error) -> Self {
        WebhookLogError::DatabaseError(e.to_string())
    }
}

/// The audit trail of inbound processor notifications. Entries are written before any processing takes place and
/// then marked with the outcome.
#[allow(async_fn_in_trait)]
pub trait WebhookLogManagement {
    async fn insert_webhook_log(&self, entry: NewWebhookLog) -> Result<WebhookLogEntry, WebhookLogError>;

    /// Marks the entry as handled. `error` carries a warning for partially successful side effects.
    async fn mark_webhook_processed(
        &self,
        id: i64,
        shop: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), WebhookLogError>;

    /// Records a processing failure. The entry stays unprocessed.
    async fn mark_webhook_failed(&self, id: i64, shop: Option<&str>, error: &str) -> Result<(), WebhookLogError>;

    async fn fetch_webhook_log(&self, id: i64) -> Result<Option<WebhookLogEntry>, WebhookLogError>;
}
