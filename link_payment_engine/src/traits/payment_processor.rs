use lpg_common::{Amount, Currency, PaymentStatus};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("The payment processor is unavailable. {0}")]
    Unavailable(String),
    #[error("The payment processor rejected the request. {0}")]
    Rejected(String),
    #[error("The payment processor sent an invalid response. {0}")]
    InvalidResponse(String),
}

/// Everything the processor needs to open a hosted checkout.
#[derive(Debug, Clone)]
pub struct PaymentLinkRequest {
    pub business_id: String,
    pub business_name: String,
    pub wallet_address: String,
    pub amount: Amount,
    pub currency: Currency,
    pub order_id: String,
    pub order_name: String,
    pub success_url: String,
    pub cancel_url: String,
    pub webhook_url: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorLink {
    pub payment_id: String,
    pub payment_url: String,
    /// When the processor stops accepting payment on the link, if it says
    pub expires_at: Option<String>,
}

/// The processor's view of a payment, as returned by a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorStatus {
    pub status: PaymentStatus,
    pub xrpl_tx_hash: Option<String>,
    pub confirmations: Option<i64>,
}

/// The payment-link provider.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<ProcessorLink, ProcessorError>;

    /// Checks the HMAC-SHA256 signature of a raw webhook body. A missing signature never verifies.
    fn verify_webhook_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool;

    async fn fetch_payment_status(
        &self,
        link_payment_id: &str,
        business_id: &str,
    ) -> Result<ProcessorStatus, ProcessorError>;
}
