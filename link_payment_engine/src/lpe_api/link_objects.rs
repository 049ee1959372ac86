use std::{fmt::Display, future::Future, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::db_types::{OrderDetails, PaymentRecord};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
/// A reservation without a link that is older than this is assumed to be abandoned.
pub const DEFAULT_RESERVATION_TIMEOUT: Duration = Duration::from_secs(120);

/// How a completed payment becomes a real order on the commerce platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderModel {
    /// A draft order is created with the link, and completed when the payment clears.
    #[default]
    Draft,
    /// The order already exists, and is marked as paid (or cancelled) directly.
    Legacy,
}

impl Display for OrderModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderModel::Draft => f.write_str("draft"),
            OrderModel::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for OrderModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(OrderModel::Draft),
            "legacy" => Ok(OrderModel::Legacy),
            _ => Err(format!("Unknown order model: {s}")),
        }
    }
}

/// A storefront's request for a payment link.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub order_name: String,
    pub amount: String,
    pub currency: String,
    pub details: Option<OrderDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub payment_url: String,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_order_url: Option<String>,
    /// True if an existing link was handed back instead of creating a new one
    #[serde(skip)]
    pub reused: bool,
}

impl PaymentLinkResponse {
    /// Builds a response from a record that holds a link. Returns `None` for reservations.
    pub fn from_record(record: &PaymentRecord, reused: bool) -> Option<Self> {
        Some(Self {
            payment_url: record.link_payment_url.clone()?,
            payment_id: record.link_payment_id.clone()?,
            draft_order_id: record.draft_order_id.clone(),
            draft_order_url: record.draft_order_url.clone(),
            reused,
        })
    }
}

/// What happened to a processor notification.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The new status was stored and no order side effects were needed.
    Recorded(PaymentRecord),
    /// The record was already past `pending`. Nothing but history was written.
    Duplicate(PaymentRecord),
    /// The payment completed and the order was finalised on the commerce platform.
    OrderFinalized(PaymentRecord),
    /// The payment was cancelled or expired, and the draft or order was cleaned up.
    CleanedUp { record: PaymentRecord, warning: Option<String> },
    /// The payment completed, but the order could not be finalised. The payment stays `completed`.
    OrderFinalizationFailed { record: PaymentRecord, reason: String },
}

impl WebhookOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            WebhookOutcome::Recorded(r) | WebhookOutcome::Duplicate(r) | WebhookOutcome::OrderFinalized(r) => r,
            WebhookOutcome::CleanedUp { record, .. } | WebhookOutcome::OrderFinalizationFailed { record, .. } => record,
        }
    }

    /// A message for the processor when the webhook was accepted but a side effect did not go through.
    pub fn warning(&self) -> Option<String> {
        match self {
            WebhookOutcome::OrderFinalizationFailed { reason, .. } => {
                Some(format!("Payment recorded but order creation failed: {reason}"))
            },
            WebhookOutcome::CleanedUp { warning, .. } => warning.clone(),
            _ => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, WebhookOutcome::Duplicate(_))
    }
}

/// Runs `fut`, giving up after `limit`. A timeout is turned into an error by `on_timeout`.
pub async fn bounded<T, E, F>(limit: Duration, fut: F, on_timeout: impl FnOnce() -> E) -> Result<T, E>
where F: Future<Output = Result<T, E>> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
