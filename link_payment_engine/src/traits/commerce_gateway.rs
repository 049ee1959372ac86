use lpg_common::{Amount, Currency};
use thiserror::Error;

use crate::db_types::{ActualOrder, DraftOrderRef, OrderDetails};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("No offline session exists for shop {0}")]
    NoSession(String),
    #[error("The commerce platform rejected the request. {0}")]
    UserErrors(String),
    #[error("The commerce platform is unavailable. {0}")]
    Unavailable(String),
    #[error("The commerce platform sent an invalid response. {0}")]
    InvalidResponse(String),
    #[error("The commerce platform did not respond in time")]
    Timeout,
    #[error("Operation not supported. {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct DraftOrderRequest {
    pub order_id: String,
    pub order_name: String,
    pub link_payment_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub details: Option<OrderDetails>,
}

/// Payment evidence written onto a finalised order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAnnotation {
    pub xrpl_tx_hash: String,
    pub payment_method: String,
    pub confirmations: i64,
    pub note: String,
}

/// A legacy-model order that has been paid off-platform.
#[derive(Debug, Clone)]
pub struct PaidOrder {
    pub order_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub xrpl_tx_hash: String,
    /// Replaces the order note
    pub note: String,
}

/// The commerce platform. Every call is scoped to a shop, and authenticates with that shop's offline session.
#[allow(async_fn_in_trait)]
pub trait CommerceGateway {
    async fn create_draft_order(&self, shop: &str, request: &DraftOrderRequest) -> Result<DraftOrderRef, GatewayError>;

    /// Converts a draft into a real, paid order. Completing an already completed draft returns the existing order.
    async fn complete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<ActualOrder, GatewayError>;

    async fn annotate_order(&self, shop: &str, order_id: &str, annotation: &OrderAnnotation)
        -> Result<(), GatewayError>;

    async fn delete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<(), GatewayError>;

    async fn cancel_order(&self, shop: &str, order_id: &str, reason: &str) -> Result<(), GatewayError>;

    async fn mark_order_as_paid(&self, shop: &str, order: &PaidOrder) -> Result<(), GatewayError>;
}
