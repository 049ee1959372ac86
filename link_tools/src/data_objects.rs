use lpg_common::{Amount, Currency, PaymentStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long a hosted checkout link stays payable, in minutes.
pub const CHECKOUT_LINK_DURATION_MINS: u32 = 60;

/// Everything needed to open a hosted checkout on LINK for one order.
#[derive(Debug, Clone)]
pub struct CreatePaymentLinkRequest {
    pub business_id: String,
    pub business_name: String,
    pub amount: Amount,
    pub currency: Currency,
    pub order_id: String,
    pub order_name: String,
    pub success_url: String,
    pub cancel_url: String,
    pub webhook_url: String,
    /// The merchant's XRPL receiving address
    pub wallet_address: String,
    pub metadata: Value,
}

/// The JSON body that the `create-link` endpoint expects.
#[derive(Debug, Serialize)]
pub(crate) struct CreateLinkBody<'a> {
    pub business_id: &'a str,
    pub business_name: &'a str,
    pub title: String,
    pub payment_amount: &'a str,
    pub payment_currency: Currency,
    pub checkout_link_duration: u32,
    pub wallet_address: &'a str,
    pub order_id: &'a str,
    pub order_name: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub webhook_url: &'a str,
    pub metadata: &'a Value,
    pub wallet_network: &'static str,
    pub link_type: &'static str,
    pub supported_currencies: [Currency; 2],
}

impl<'a> From<&'a CreatePaymentLinkRequest> for CreateLinkBody<'a> {
    fn from(req: &'a CreatePaymentLinkRequest) -> Self {
        Self {
            business_id: &req.business_id,
            business_name: &req.business_name,
            title: format!("Order {}", req.order_name),
            payment_amount: req.amount.as_str(),
            payment_currency: req.currency,
            checkout_link_duration: CHECKOUT_LINK_DURATION_MINS,
            wallet_address: &req.wallet_address,
            order_id: &req.order_id,
            order_name: &req.order_name,
            success_url: &req.success_url,
            cancel_url: &req.cancel_url,
            webhook_url: &req.webhook_url,
            metadata: &req.metadata,
            wallet_network: "xrpl",
            link_type: "checkout",
            supported_currencies: lpg_common::SUPPORTED_CURRENCIES,
        }
    }
}

/// A payable link, as issued by LINK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub payment_id: String,
    pub payment_url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// `create-link` wraps the link in two levels of `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateLinkResponse {
    pub data: CreateLinkData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateLinkData {
    pub data: PaymentLink,
}

/// The processor's current view of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub status: PaymentStatus,
    #[serde(default)]
    pub xrpl_tx_hash: Option<String>,
    #[serde(default)]
    pub confirmations: Option<i64>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}
