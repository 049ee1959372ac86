use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use link_payment_engine::{
    db_types::{
        ActualOrder,
        DraftOrderRef,
        MerchantConfig,
        NewHistoryEntry,
        NewMerchantConfig,
        NewPaymentRecord,
        PaymentLinkDocument,
        PaymentRecord,
        PaymentUpdate,
        ReserveResult,
    },
    traits::{
        CommerceGateway,
        DraftOrderRequest,
        GatewayError,
        MerchantConfigError,
        MerchantManagement,
        OrderAnnotation,
        PaidOrder,
        PaymentLinkRequest,
        PaymentProcessor,
        PaymentRecordManagement,
        PaymentStoreError,
        ProcessorError,
        ProcessorLink,
        ProcessorStatus,
    },
};
use lpg_common::{Currency, PaymentStatus};
use mockall::mock;

use super::helpers::SHOP;

pub const VALID_SIGNATURE: &str = "t=1717243200,v1=5f2b1c";
pub const LINK_EXPIRY: &str = "2024-06-02T12:00:00Z";

mock! {
    pub PaymentStore {}
    impl PaymentRecordManagement for PaymentStore {
        async fn find_by_shop_and_order(&self, shop: &str, order_id: &str, statuses: &[PaymentStatus]) -> Result<Option<PaymentRecord>, PaymentStoreError>;
        async fn find_by_link_payment_id(&self, link_payment_id: &str) -> Result<Option<PaymentRecord>, PaymentStoreError>;
        async fn fetch_payment(&self, id: i64) -> Result<Option<PaymentRecord>, PaymentStoreError>;
        async fn reserve_checkout(&self, record: NewPaymentRecord) -> Result<ReserveResult, PaymentStoreError>;
        async fn upsert_by_link_payment_id(&self, reservation_id: i64, doc: PaymentLinkDocument) -> Result<PaymentRecord, PaymentStoreError>;
        async fn release_reservation(&self, id: i64) -> Result<bool, PaymentStoreError>;
        async fn append_history(&self, id: i64, entry: NewHistoryEntry) -> Result<(), PaymentStoreError>;
        async fn conditional_update_status(&self, id: i64, update: PaymentUpdate) -> Result<Option<PaymentRecord>, PaymentStoreError>;
        async fn record_actual_order(&self, id: i64, order: ActualOrder, entry: NewHistoryEntry) -> Result<Option<PaymentRecord>, PaymentStoreError>;
        async fn fetch_stale_pending(&self, older_than: DateTime<Utc>, limit: i64) -> Result<Vec<PaymentRecord>, PaymentStoreError>;
    }
    impl MerchantManagement for PaymentStore {
        async fn fetch_merchant_config(&self, shop: &str) -> Result<Option<MerchantConfig>, MerchantConfigError>;
        async fn upsert_merchant_config(&self, config: NewMerchantConfig) -> Result<MerchantConfig, MerchantConfigError>;
    }
}

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
}

impl FakeProcessor {
    pub fn count(&self) -> usize {
        self.links_created.load(Ordering::SeqCst)
    }
}

impl PaymentProcessor for FakeProcessor {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<ProcessorLink, ProcessorError> {
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
        Err(ProcessorError::Unavailable("No status available".into()))
    }
}

pub fn merchant_config(enabled: bool) -> MerchantConfig {
    MerchantConfig {
        id: 1,
        shop: SHOP.into(),
        link_business_id: "biz_42".into(),
        xrpl_address: "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH".into(),
        enabled,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A pending payment for order `co_1`. With a `link_payment_id`, it looks like a record that link creation finished.
pub fn payment_record(id: i64, link_payment_id: Option<&str>) -> PaymentRecord {
    PaymentRecord {
        id,
        shop: SHOP.into(),
        order_id: "co_1".into(),
        order_name: "#1001".into(),
        link_payment_id: link_payment_id.map(String::from),
        link_payment_url: link_payment_id.map(|p| format!("https://pay.link.xyz/{p}")),
        amount: "25.00".parse().unwrap(),
        currency: Currency::Rlusd,
        status: PaymentStatus::Pending,
        order_details: None,
        draft_order_id: link_payment_id.map(|_| "gid://shopify/DraftOrder/7".to_string()),
        draft_order_url: link_payment_id.map(|_| format!("https://{SHOP}/admin/draft_orders/7")),
        draft_order_created_at: link_payment_id.map(|_| Utc::now()),
        actual_order_id: None,
        actual_order_name: None,
        actual_order_created_at: None,
        xrpl_tx_hash: None,
        xrpl_confirmations: None,
        paid_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        payment_history: vec![],
    }
}
