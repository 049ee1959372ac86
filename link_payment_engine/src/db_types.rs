use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use lpg_common::{Amount, Currency, PaymentStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

//--------------------------------------    PaymentRecord      ---------------------------------------------------------
/// One checkout order's payment, as tracked by the gateway.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: i64,
    /// The tenant, e.g. "my-shop.myshopify.com"
    pub shop: String,
    /// The checkout reference supplied by the storefront
    pub order_id: String,
    pub order_name: String,
    pub link_payment_id: Option<String>,
    pub link_payment_url: Option<String>,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub order_details: Option<Json<OrderDetails>>,
    pub draft_order_id: Option<String>,
    pub draft_order_url: Option<String>,
    pub draft_order_created_at: Option<DateTime<Utc>>,
    pub actual_order_id: Option<String>,
    pub actual_order_name: Option<String>,
    pub actual_order_created_at: Option<DateTime<Utc>>,
    pub xrpl_tx_hash: Option<String>,
    pub xrpl_confirmations: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from `payment_history`
    #[sqlx(skip)]
    pub payment_history: Vec<HistoryEntry>,
}

impl PaymentRecord {
    pub fn details(&self) -> Option<&OrderDetails> {
        self.order_details.as_ref().map(|j| &j.0)
    }

    pub fn has_link(&self) -> bool {
        self.link_payment_url.is_some()
    }

    pub fn last_history_action(&self) -> Option<HistoryAction> {
        self.payment_history.last().map(|e| e.action)
    }
}

impl Display for PaymentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Payment #{} [{}] {} {} {} ({})",
            self.id,
            self.shop,
            self.order_name,
            self.amount,
            self.currency,
            self.status
        )
    }
}

/// A checkout reservation: the record that is inserted before any external call is made.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub shop: String,
    pub order_id: String,
    pub order_name: String,
    pub amount: Amount,
    pub currency: Currency,
    pub order_details: Option<OrderDetails>,
}

/// The result of trying to reserve a checkout.
#[derive(Debug, Clone)]
pub enum ReserveResult {
    Reserved(PaymentRecord),
    /// Another request already holds an open (pending or completed) record for this order.
    AlreadyExists(PaymentRecord),
}

/// Processor link and draft order details that are attached to a reservation once they are known.
/// Every field is set-once: values already stored are never overwritten.
#[derive(Debug, Clone)]
pub struct PaymentLinkDocument {
    pub link_payment_id: String,
    pub link_payment_url: String,
    pub draft_order: Option<DraftOrderRef>,
    pub history: NewHistoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderRef {
    pub draft_order_id: String,
    pub draft_order_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualOrder {
    pub order_id: String,
    pub order_name: String,
}

/// A status transition, applied only while the stored record is still `pending`.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    /// Kept unless a new value is supplied
    pub xrpl_tx_hash: Option<String>,
    /// Only ever increases
    pub xrpl_confirmations: Option<i64>,
    /// Only written if the record has no `paid_at` yet
    pub paid_at: Option<DateTime<Utc>>,
    pub history: NewHistoryEntry,
}

//--------------------------------------    Payment history    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    PaymentCompleted,
    PaymentFailed,
    PaymentExpired,
    PaymentCancelled,
    OrderCreated,
    OrderCompletionFailed,
    DraftDeleted,
    DuplicateIgnored,
}

impl HistoryAction {
    /// The history action recorded when a payment moves into `status`.
    pub fn for_status(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => HistoryAction::Updated,
            PaymentStatus::Completed => HistoryAction::PaymentCompleted,
            PaymentStatus::Failed => HistoryAction::PaymentFailed,
            PaymentStatus::Expired => HistoryAction::PaymentExpired,
            PaymentStatus::Cancelled => HistoryAction::PaymentCancelled,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub details: Json<Value>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub action: HistoryAction,
    pub details: Value,
}

impl NewHistoryEntry {
    pub fn new(action: HistoryAction, details: Value) -> Self {
        Self { action, details }
    }
}

//--------------------------------------     OrderDetails      ---------------------------------------------------------
/// A snapshot of the buyer's cart and contact details, taken when the payment link is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subtotal: Option<String>,
    #[serde(default)]
    pub shipping: Option<String>,
    #[serde(default)]
    pub tax: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub title: String,
    pub quantity: i64,
    pub price: String,
    #[serde(default)]
    pub variant: Option<Variant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub code: String,
    pub amount: String,
}

//--------------------------------------    WebhookLogEntry    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLogEntry {
    pub id: i64,
    pub event: String,
    /// The raw request body, verbatim
    pub payload: String,
    pub processed: bool,
    pub error: Option<String>,
    pub shop: Option<String>,
    pub link_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewWebhookLog {
    pub event: String,
    pub payload: String,
    pub link_payment_id: Option<String>,
    pub shop: Option<String>,
    /// Set when the entry is written for a request that was rejected outright
    pub error: Option<String>,
}

//--------------------------------------     WebhookEvent      ---------------------------------------------------------
/// A status notification from the payment processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: String,
    #[serde(alias = "paymentId")]
    pub link_payment_id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub xrpl_tx_hash: Option<String>,
    #[serde(default)]
    pub confirmations: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WebhookEvent {
    /// The ledger transaction hash, if the event carries a non-empty one.
    pub fn tx_hash(&self) -> Option<&str> {
        self.xrpl_tx_hash.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The processor's event time. Unparseable or missing timestamps yield `None`.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|t| t.with_timezone(&Utc))
    }
}

//--------------------------------------    MerchantConfig     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantConfig {
    pub id: i64,
    pub shop: String,
    pub link_business_id: String,
    pub xrpl_address: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMerchantConfig {
    pub shop: String,
    pub link_business_id: String,
    pub xrpl_address: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerchantConfigValidationError {
    #[error("LINK Business ID is required")]
    MissingBusinessId,
    #[error("XRPL Address is required")]
    MissingXrplAddress,
    #[error("Invalid XRPL address format")]
    InvalidXrplAddress,
}

impl NewMerchantConfig {
    /// Classic XRPL addresses start with 'r' and are 25 to 35 characters long.
    pub fn validate(&self) -> Result<(), MerchantConfigValidationError> {
        if self.link_business_id.trim().is_empty() {
            return Err(MerchantConfigValidationError::MissingBusinessId);
        }
        let address = self.xrpl_address.trim();
        if address.is_empty() {
            return Err(MerchantConfigValidationError::MissingXrplAddress);
        }
        if !address.starts_with('r') || address.len() < 25 {
            return Err(MerchantConfigValidationError::InvalidXrplAddress);
        }
        Ok(())
    }
}

//--------------------------------------      ShopSession      ---------------------------------------------------------
/// An OAuth session written by the Shopify app install flow. Offline sessions carry a long-lived admin token.
#[derive(Clone, FromRow)]
pub struct ShopSession {
    pub id: String,
    pub shop: String,
    pub state: String,
    pub is_online: bool,
    pub scope: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub access_token: String,
}

impl Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("is_online", &self.is_online)
            .field("scope", &self.scope)
            .field("expires", &self.expires)
            .field("access_token", &"****")
            .finish()
    }
}
