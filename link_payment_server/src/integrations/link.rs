use link_payment_engine::traits::{
    PaymentLinkRequest,
    PaymentProcessor,
    ProcessorError,
    ProcessorLink,
    ProcessorStatus,
};
use link_tools::{verify_webhook_signature, CreatePaymentLinkRequest, LinkApi, LinkApiError, LinkConfig};
use log::*;
use lpg_common::Secret;

/// The LINK API, plus the shared secret it signs webhooks with.
#[derive(Clone)]
pub struct LinkProcessor {
    api: LinkApi,
    webhook_secret: Secret<String>,
}

impl LinkProcessor {
    pub fn new(config: LinkConfig, webhook_secret: Secret<String>) -> Result<Self, LinkApiError> {
        let api = LinkApi::new(config)?;
        Ok(Self { api, webhook_secret })
    }
}

impl PaymentProcessor for LinkProcessor {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<ProcessorLink, ProcessorError> {
        let request = CreatePaymentLinkRequest {
            business_id: request.business_id,
            business_name: request.business_name,
            amount: request.amount,
            currency: request.currency,
            order_id: request.order_id,
            order_name: request.order_name,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            webhook_url: request.webhook_url,
            wallet_address: request.wallet_address,
            metadata: request.metadata,
        };
        let link = self.api.create_payment_link(&request).await.map_err(to_processor_error)?;
        Ok(ProcessorLink { payment_id: link.payment_id, payment_url: link.payment_url, expires_at: link.expires_at })
    }

    fn verify_webhook_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        if self.webhook_secret.is_empty() {
            warn!("🔗 LPG_LINK_WEBHOOK_SECRET is not set. Refusing to trust any webhook.");
            return false;
        }
        verify_webhook_signature(raw_body, signature, self.webhook_secret.reveal())
    }

    async fn fetch_payment_status(
        &self,
        link_payment_id: &str,
        business_id: &str,
    ) -> Result<ProcessorStatus, ProcessorError> {
        let report = self.api.fetch_payment_status(link_payment_id, business_id).await.map_err(to_processor_error)?;
        Ok(ProcessorStatus {
            status: report.status,
            xrpl_tx_hash: report.xrpl_tx_hash,
            confirmations: report.confirmations,
        })
    }
}

/// Server-side failures and rate limiting are outages. Any other HTTP error is a rejection of the request itself.
fn to_processor_error(e: LinkApiError) -> ProcessorError {
    match e {
        LinkApiError::Initialization(msg) | LinkApiError::Unavailable(msg) => ProcessorError::Unavailable(msg),
        LinkApiError::Rejected { status, message } if status >= 500 || status == 429 => {
            ProcessorError::Unavailable(format!("Error {status}. {message}"))
        },
        LinkApiError::Rejected { message, .. } => ProcessorError::Rejected(message),
        LinkApiError::InvalidResponse(msg) => ProcessorError::InvalidResponse(msg),
    }
}
