use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use link_payment_engine::{
    db_types::{ActualOrder, DraftOrderRef},
    traits::{
        CommerceGateway,
        DraftOrderRequest,
        GatewayError,
        OrderAnnotation,
        PaidOrder,
        PaymentLinkRequest,
        PaymentProcessor,
        ProcessorError,
        ProcessorLink,
        ProcessorStatus,
    },
};
use mockall::mock;

pub const VALID_SIGNATURE: &str = "c0ffee";
pub const LINK_EXPIRY: &str = "2024-06-02T12:00:00Z";

mock! {
    pub Gateway {}
    impl CommerceGateway for Gateway {
        async fn create_draft_order(&self, shop: &str, request: &DraftOrderRequest) -> Result<DraftOrderRef, GatewayError>;
        async fn complete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<ActualOrder, GatewayError>;
        async fn annotate_order(&self, shop: &str, order_id: &str, annotation: &OrderAnnotation) -> Result<(), GatewayError>;
        async fn delete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<(), GatewayError>;
        async fn cancel_order(&self, shop: &str, order_id: &str, reason: &str) -> Result<(), GatewayError>;
        async fn mark_order_as_paid(&self, shop: &str, order: &PaidOrder) -> Result<(), GatewayError>;
    }
}

/// A stand-in for LINK. Links are numbered in creation order, and only [`VALID_SIGNATURE`] verifies.
#[derive(Clone, Default)]
pub struct FakeProcessor {
    pub links_created: Arc<AtomicUsize>,
    pub fail_with: Option<ProcessorError>,
    pub status: Option<ProcessorStatus>,
    pub delay: Option<Duration>,
}

impl FakeProcessor {
    pub fn failing(err: ProcessorError) -> Self {
        Self { fail_with: Some(err), ..Default::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    pub fn with_status(status: ProcessorStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn count(&self) -> usize {
        self.links_created.load(Ordering::SeqCst)
    }
}

impl PaymentProcessor for FakeProcessor {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<ProcessorLink, ProcessorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        let n = self.links_created.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(request.webhook_url.ends_with("/api/webhooks/link"));
        Ok(ProcessorLink {
            payment_id: format!("lp_{n}"),
            payment_url: format!("https://pay.link.xyz/lp_{n}"),
            expires_at: Some(LINK_EXPIRY.into()),
        })
    }

    fn verify_webhook_signature(&self, _raw_body: &[u8], signature: Option<&str>) -> bool {
        signature == Some(VALID_SIGNATURE)
    }

    async fn fetch_payment_status(
        &self,
        _link_payment_id: &str,
        _business_id: &str,
    ) -> Result<ProcessorStatus, ProcessorError> {
        self.status.clone().ok_or_else(|| ProcessorError::Unavailable("No status available".into()))
    }
}

pub fn draft_ref(n: u32) -> DraftOrderRef {
    DraftOrderRef {
        draft_order_id: format!("gid://shopify/DraftOrder/{n}"),
        draft_order_url: Some(format!("https://my-shop.myshopify.com/admin/draft_orders/{n}")),
    }
}

pub fn actual_order(n: u32) -> ActualOrder {
    ActualOrder { order_id: format!("gid://shopify/Order/{n}"), order_name: format!("#{n}") }
}
