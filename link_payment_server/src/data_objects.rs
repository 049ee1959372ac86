use link_payment_engine::{
    db_types::{Address, Discount, LineItem, OrderDetails},
    CheckoutRequest,
    PaymentLinkResponse,
    WebhookOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The checkout extension's request for a payment link.
///
/// Amounts may arrive as JSON strings or numbers. They are kept as decimal strings from here on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentParams {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub order_name: String,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub currency: String,
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
    pub subtotal: Option<Value>,
    #[serde(default)]
    pub shipping: Option<Value>,
    #[serde(default)]
    pub tax: Option<Value>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub note: Option<String>,
}

impl CreatePaymentParams {
    fn has_details(&self) -> bool {
        !self.line_items.is_empty() ||
            self.shipping_address.is_some() ||
            self.billing_address.is_some() ||
            self.email.is_some() ||
            self.phone.is_some() ||
            self.subtotal.is_some() ||
            self.shipping.is_some() ||
            self.tax.is_some() ||
            self.discount.is_some() ||
            self.total.is_some() ||
            self.note.is_some()
    }
}

impl From<CreatePaymentParams> for CheckoutRequest {
    fn from(params: CreatePaymentParams) -> Self {
        let details = params.has_details().then(|| OrderDetails {
            line_items: params.line_items.clone(),
            shipping_address: params.shipping_address.clone(),
            billing_address: params.billing_address.clone(),
            email: params.email.clone(),
            phone: params.phone.clone(),
            subtotal: params.subtotal.as_ref().and_then(value_to_string),
            shipping: params.shipping.as_ref().and_then(value_to_string),
            tax: params.tax.as_ref().and_then(value_to_string),
            discount: params.discount.clone(),
            total: params.total.as_ref().and_then(value_to_string),
            currency: Some(params.currency.clone()).filter(|c| !c.is_empty()),
            note: params.note.clone(),
        });
        CheckoutRequest {
            order_id: params.order_id,
            order_name: params.order_name,
            amount: value_to_string(&params.amount).unwrap_or_default(),
            currency: params.currency,
            details,
        }
    }
}

/// A JSON string is used as is, a JSON number is printed in full. Anything else has no amount.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_url: String,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_order_url: Option<String>,
}

impl From<PaymentLinkResponse> for CreatePaymentResponse {
    fn from(response: PaymentLinkResponse) -> Self {
        Self {
            success: true,
            payment_url: response.payment_url,
            payment_id: response.payment_id,
            draft_order_id: response.draft_order_id,
            draft_order_url: response.draft_order_url,
        }
    }
}

/// The acknowledgement sent back to LINK. A warning means the payment was recorded, but needs operator attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<&WebhookOutcome> for WebhookReceipt {
    fn from(outcome: &WebhookOutcome) -> Self {
        Self { received: true, warning: outcome.warning() }
    }
}

/// Body of Shopify's `app/scopes_update` webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopesUpdatePayload {
    #[serde(default)]
    pub current: Vec<String>,
    #[serde(default)]
    pub previous: Vec<String>,
}
