use std::{fmt::Debug, str::FromStr, time::Duration};

use chrono::Utc;
use log::*;
use lpg_common::{Amount, Currency, PaymentStatus};
use serde_json::{json, Map, Value};

use crate::{
    db_types::{
        DraftOrderRef,
        HistoryAction,
        MerchantConfig,
        NewHistoryEntry,
        NewPaymentRecord,
        PaymentLinkDocument,
        PaymentRecord,
        ReserveResult,
    },
    lpe_api::{
        errors::PaymentLinkError,
        link_objects::{
            bounded,
            CheckoutRequest,
            OrderModel,
            PaymentLinkResponse,
            DEFAULT_RESERVATION_TIMEOUT,
            DEFAULT_UPSTREAM_TIMEOUT,
        },
    },
    traits::{
        CommerceGateway,
        DraftOrderRequest,
        GatewayError,
        MerchantManagement,
        PaymentLinkRequest,
        PaymentProcessor,
        PaymentRecordManagement,
        ProcessorError,
        ProcessorLink,
    },
};

const OPEN_STATUSES: [PaymentStatus; 2] = [PaymentStatus::Pending, PaymentStatus::Completed];

#[derive(Debug, Clone)]
pub struct PaymentLinkSettings {
    /// Public base URL of this service. Redirect and webhook URLs are built from it.
    pub app_url: String,
    pub order_model: OrderModel,
    pub upstream_timeout: Duration,
    pub reservation_timeout: Duration,
}

impl Default for PaymentLinkSettings {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8360".to_string(),
            order_model: OrderModel::default(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            reservation_timeout: DEFAULT_RESERVATION_TIMEOUT,
        }
    }
}

impl PaymentLinkSettings {
    pub fn success_url(&self, order_id: &str) -> String {
        format!("{}/payment/success?order_id={order_id}", self.base())
    }

    pub fn cancel_url(&self, order_id: &str) -> String {
        format!("{}/payment/cancel?order_id={order_id}", self.base())
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/api/webhooks/link", self.base())
    }

    fn base(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }
}

/// `PaymentLinkApi` turns a storefront checkout into a LINK payment link.
///
/// Link creation is idempotent per `(shop, order_id)`: while a pending or completed payment exists for an order, every
/// request for that order receives the same link. The payment record is reserved before the processor is called, so
/// two concurrent requests can never both open a link.
pub struct PaymentLinkApi<B, P, G> {
    db: B,
    processor: P,
    gateway: G,
    settings: PaymentLinkSettings,
}

impl<B, P, G> Debug for PaymentLinkApi<B, P, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentLinkApi ({})", self.settings.app_url)
    }
}

impl<B, P, G> PaymentLinkApi<B, P, G> {
    pub fn new(db: B, processor: P, gateway: G, settings: PaymentLinkSettings) -> Self {
        Self { db, processor, gateway, settings }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn settings(&self) -> &PaymentLinkSettings {
        &self.settings
    }
}

impl<B, P, G> PaymentLinkApi<B, P, G>
where
    B: PaymentRecordManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway,
{
    /// Returns a payment link for the checkout, creating one if the order does not have one yet.
    pub async fn create_payment_link(
        &self,
        shop: &str,
        request: CheckoutRequest,
    ) -> Result<PaymentLinkResponse, PaymentLinkError> {
        let (amount, currency) = validate_request(&request)?;
        let config = self
            .db
            .fetch_merchant_config(shop)
            .await?
            .filter(|c| c.enabled)
            .ok_or_else(|| PaymentLinkError::NotConfigured(shop.to_string()))?;

        if let Some(existing) = self.db.find_by_shop_and_order(shop, &request.order_id, &OPEN_STATUSES).await? {
            if let Some(response) = PaymentLinkResponse::from_record(&existing, true) {
                info!("🔗 Order {} already has payment link {}. Reusing it.", request.order_name, response.payment_id);
                return Ok(response);
            }
        }

        let new_record = NewPaymentRecord {
            shop: shop.to_string(),
            order_id: request.order_id.clone(),
            order_name: request.order_name.clone(),
            amount: amount.clone(),
            currency,
            order_details: request.details.clone(),
        };
        let reservation = match self.reserve(new_record).await? {
            Ok(reservation) => reservation,
            Err(response) => return Ok(response),
        };

        let link_request = PaymentLinkRequest {
            business_id: config.link_business_id.clone(),
            business_name: shop.to_string(),
            wallet_address: config.xrpl_address.clone(),
            amount: amount.clone(),
            currency,
            order_id: request.order_id.clone(),
            order_name: request.order_name.clone(),
            success_url: self.settings.success_url(&request.order_id),
            cancel_url: self.settings.cancel_url(&request.order_id),
            webhook_url: self.settings.webhook_url(),
            metadata: link_metadata(shop, &config),
        };
        let link = match bounded(self.settings.upstream_timeout, self.processor.create_payment_link(link_request), || {
            ProcessorError::Unavailable("Timed out waiting for the payment processor".to_string())
        })
        .await
        {
            Ok(link) => link,
            Err(e) => {
                warn!("🔗 Could not create a payment link for order {}. {e}", request.order_name);
                self.release(reservation.id).await;
                return Err(e.into());
            },
        };
        info!("🔗 Payment link {} created for {shop}/{}", link.payment_id, request.order_name);

        let (draft_order, draft_error) = match self.settings.order_model {
            OrderModel::Draft => {
                let draft_request = DraftOrderRequest {
                    order_id: request.order_id.clone(),
                    order_name: request.order_name.clone(),
                    link_payment_id: link.payment_id.clone(),
                    amount,
                    currency,
                    details: request.details,
                };
                match bounded(
                    self.settings.upstream_timeout,
                    self.gateway.create_draft_order(shop, &draft_request),
                    || GatewayError::Timeout,
                )
                .await
                {
                    Ok(draft) => (Some(draft), None),
                    Err(e) => {
                        warn!("🛍️ No draft order for {}. The link is still valid. {e}", link.payment_id);
                        (None, Some(e.to_string()))
                    },
                }
            },
            OrderModel::Legacy => (None, None),
        };

        let details = created_details(&link, &draft_order, draft_error);
        let doc = PaymentLinkDocument {
            link_payment_id: link.payment_id.clone(),
            link_payment_url: link.payment_url.clone(),
            draft_order,
            history: NewHistoryEntry::new(HistoryAction::Created, details),
        };
        let record = match self.db.upsert_by_link_payment_id(reservation.id, doc).await {
            Ok(record) => record,
            Err(e) => {
                error!("🔗 Payment link {} was created but could not be saved. {e}", link.payment_id);
                self.release(reservation.id).await;
                return Err(e.into());
            },
        };
        PaymentLinkResponse::from_record(&record, false)
            .ok_or_else(|| PaymentLinkError::DatabaseError(format!("Payment record #{} has no link", record.id)))
    }

    /// Claims the order for this request. If another request already holds the order, its link is returned in the
    /// `Err` arm instead. Abandoned reservations are cleared once.
    async fn reserve(
        &self,
        record: NewPaymentRecord,
    ) -> Result<Result<PaymentRecord, PaymentLinkResponse>, PaymentLinkError> {
        let order_id = record.order_id.clone();
        for attempt in 0..2 {
            match self.db.reserve_checkout(record.clone()).await? {
                ReserveResult::Reserved(reservation) => return Ok(Ok(reservation)),
                ReserveResult::AlreadyExists(existing) => {
                    if let Some(response) = PaymentLinkResponse::from_record(&existing, true) {
                        debug!("🔗 A concurrent request created link {} for {order_id}", response.payment_id);
                        return Ok(Err(response));
                    }
                    let age = (Utc::now() - existing.created_at).to_std().unwrap_or_default();
                    if attempt == 0 && age > self.settings.reservation_timeout {
                        warn!("🔗 Reservation #{} for {order_id} looks abandoned. Releasing it.", existing.id);
                        self.db.release_reservation(existing.id).await?;
                        continue;
                    }
                    return Err(PaymentLinkError::LinkCreationInProgress(order_id));
                },
            }
        }
        Err(PaymentLinkError::LinkCreationInProgress(order_id))
    }

    async fn release(&self, reservation_id: i64) {
        if let Err(e) = self.db.release_reservation(reservation_id).await {
            error!("🔗 Could not release reservation #{reservation_id}. {e}");
        }
    }
}

fn validate_request(request: &CheckoutRequest) -> Result<(Amount, Currency), PaymentLinkError> {
    if request.order_id.trim().is_empty() {
        return Err(PaymentLinkError::Validation("Missing order id".to_string()));
    }
    if request.order_name.trim().is_empty() {
        return Err(PaymentLinkError::Validation("Missing order name".to_string()));
    }
    let amount = Amount::from_str(&request.amount).map_err(|e| PaymentLinkError::Validation(e.to_string()))?;
    if !amount.is_positive() {
        return Err(PaymentLinkError::Validation(format!("Amount must be positive, not {amount}")));
    }
    let currency = Currency::from_str(&request.currency).map_err(|e| PaymentLinkError::Validation(e.to_string()))?;
    Ok((amount, currency))
}

fn link_metadata(shop: &str, config: &MerchantConfig) -> Value {
    json!({ "shop": shop, "xrplAddress": config.xrpl_address })
}

fn created_details(link: &ProcessorLink, draft: &Option<DraftOrderRef>, draft_error: Option<String>) -> Value {
    let mut details = Map::new();
    details.insert("paymentId".into(), Value::from(link.payment_id.as_str()));
    if let Some(expires_at) = &link.expires_at {
        details.insert("expiresAt".into(), Value::from(expires_at.as_str()));
    }
    if let Some(draft) = draft {
        details.insert("draftOrderId".into(), Value::from(draft.draft_order_id.as_str()));
    }
    if let Some(err) = draft_error {
        details.insert("draftError".into(), Value::from(err));
    }
    Value::Object(details)
}
