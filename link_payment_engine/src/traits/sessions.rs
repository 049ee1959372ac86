use thiserror::Error;

use crate::db_types::ShopSession;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::DatabaseError(e.to_string())
    }
}

/// Access to the OAuth sessions written by the Shopify app install flow.
#[allow(async_fn_in_trait)]
pub trait SessionManagement {
    /// The shop's offline session, which carries a long-lived admin API token. If there are several, the one that
    /// expires last wins.
    async fn fetch_offline_session(&self, shop: &str) -> Result<Option<ShopSession>, SessionError>;

    async fn save_session(&self, session: ShopSession) -> Result<(), SessionError>;

    /// Removes every session for the shop. Returns the number of sessions deleted.
    async fn delete_sessions_for_shop(&self, shop: &str) -> Result<u64, SessionError>;

    async fn update_session_scope(&self, session_id: &str, scope: &str) -> Result<bool, SessionError>;
}
