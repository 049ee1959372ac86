use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use lpg_common::PaymentStatus;
use serde_json::{json, Value};

use crate::{
    db_types::{HistoryAction, NewHistoryEntry, NewWebhookLog, PaymentRecord, PaymentUpdate, WebhookEvent},
    lpe_api::{
        errors::ReconciliationError,
        link_objects::{bounded, OrderModel, WebhookOutcome, DEFAULT_UPSTREAM_TIMEOUT},
    },
    traits::{
        CommerceGateway,
        GatewayError,
        MerchantManagement,
        OrderAnnotation,
        PaidOrder,
        PaymentProcessor,
        PaymentRecordManagement,
        ProcessorError,
        WebhookLogManagement,
    },
};

pub const PAYMENT_METHOD: &str = "LINK (XRPL)";
pub const SIGNATURE_FAILURE_EVENT: &str = "signature_invalid";
pub const RESYNC_EVENT: &str = "payment.resync";

#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    pub order_model: OrderModel,
    pub upstream_timeout: Duration,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self { order_model: OrderModel::default(), upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT }
    }
}

/// `ReconciliationApi` applies payment processor notifications to payment records, and turns completed payments into
/// orders on the commerce platform.
///
/// Every notification is logged before it is looked at. A record only ever leaves `pending` once; whichever delivery
/// wins that conditional update is the only one that calls the commerce platform. Failures on the commerce platform
/// never fail the notification. They are written to the webhook log and the payment history instead.
pub struct ReconciliationApi<B, P, G> {
    db: B,
    processor: P,
    gateway: G,
    settings: ReconciliationSettings,
}

impl<B, P, G> Debug for ReconciliationApi<B, P, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({} order model)", self.settings.order_model)
    }
}

impl<B, P, G> ReconciliationApi<B, P, G> {
    pub fn new(db: B, processor: P, gateway: G, settings: ReconciliationSettings) -> Self {
        Self { db, processor, gateway, settings }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P, G> ReconciliationApi<B, P, G>
where
    B: PaymentRecordManagement + WebhookLogManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway,
{
    /// Handles a raw webhook delivery. The signature is checked against the raw bytes before anything is parsed.
    pub async fn process_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, ReconciliationError> {
        let payload = String::from_utf8_lossy(raw_body).into_owned();
        if !self.processor.verify_webhook_signature(raw_body, signature) {
            warn!("🔄️ Rejecting webhook with an invalid signature");
            let entry = NewWebhookLog {
                event: SIGNATURE_FAILURE_EVENT.to_string(),
                payload,
                error: Some("Invalid webhook signature".to_string()),
                ..Default::default()
            };
            if let Err(e) = self.db.insert_webhook_log(entry).await {
                error!("🔄️ Could not log rejected webhook. {e}");
            }
            return Err(ReconciliationError::SignatureInvalid);
        }
        let value = serde_json::from_slice::<Value>(raw_body).ok();
        let event_name = value.as_ref().and_then(|v| v["event"].as_str()).unwrap_or("unknown").to_string();
        let link_payment_id = value
            .as_ref()
            .and_then(|v| v["linkPaymentId"].as_str().or_else(|| v["paymentId"].as_str()))
            .map(String::from);
        let log = self
            .db
            .insert_webhook_log(NewWebhookLog { event: event_name, payload, link_payment_id, ..Default::default() })
            .await?;
        let event = match serde_json::from_slice::<WebhookEvent>(raw_body) {
            Ok(event) => event,
            Err(e) => {
                let msg = format!("Could not decode webhook payload. {e}");
                warn!("🔄️ {msg}");
                self.mark_failed(log.id, None, &msg).await;
                return Err(ReconciliationError::MalformedPayload(msg));
            },
        };
        debug!("🔄️ Webhook #{} : {} is {}", log.id, event.link_payment_id, event.status);
        self.apply_event(log.id, event).await
    }

    /// Runs a decoded event, already logged as `log_id`, through the payment state machine.
    pub async fn apply_event(&self, log_id: i64, event: WebhookEvent) -> Result<WebhookOutcome, ReconciliationError> {
        let record = match self.db.find_by_link_payment_id(&event.link_payment_id).await? {
            Some(record) => record,
            None => {
                warn!("🔄️ Webhook for unknown payment {}", event.link_payment_id);
                self.mark_failed(log_id, None, "Payment not found").await;
                return Err(ReconciliationError::PaymentNotFound(event.link_payment_id));
            },
        };
        if record.status.is_terminal() {
            return self.ignore_duplicate(log_id, record, &event).await;
        }
        let update = PaymentUpdate {
            status: event.status,
            xrpl_tx_hash: event.tx_hash().map(String::from),
            xrpl_confirmations: event.confirmations,
            paid_at: (event.status == PaymentStatus::Completed).then(|| event.event_time().unwrap_or_else(Utc::now)),
            history: NewHistoryEntry::new(HistoryAction::for_status(event.status), event_details(&event)),
        };
        let record = match self.db.conditional_update_status(record.id, update).await? {
            Some(updated) => updated,
            None => {
                let current = self.db.fetch_payment(record.id).await?.unwrap_or(record);
                return self.ignore_duplicate(log_id, current, &event).await;
            },
        };
        info!("🔄️ Payment {} for order {} is now {}", event.link_payment_id, record.order_name, record.status);
        match (record.status, record.xrpl_tx_hash.clone()) {
            (PaymentStatus::Completed, Some(tx_hash)) => self.finalize(log_id, record, tx_hash).await,
            (PaymentStatus::Cancelled | PaymentStatus::Expired, _) => self.clean_up(log_id, record).await,
            _ => {
                self.mark_processed(log_id, Some(&record.shop), None).await;
                Ok(WebhookOutcome::Recorded(record))
            },
        }
    }

    /// Asks the processor for the current state of a pending payment, and applies any news as if it had arrived by
    /// webhook. Returns `None` if there was nothing to apply.
    pub async fn resync_payment(&self, record: &PaymentRecord) -> Result<Option<WebhookOutcome>, ReconciliationError> {
        let Some(link_payment_id) = record.link_payment_id.clone() else {
            return Ok(None);
        };
        let Some(config) = self.db.fetch_merchant_config(&record.shop).await? else {
            warn!("🔄️ {} has no merchant configuration. Cannot resync {link_payment_id}", record.shop);
            return Ok(None);
        };
        let status = bounded(
            self.settings.upstream_timeout,
            self.processor.fetch_payment_status(&link_payment_id, &config.link_business_id),
            || ProcessorError::Unavailable("Timed out waiting for the payment processor".to_string()),
        )
        .await;
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                warn!("🔄️ Could not fetch the status of {link_payment_id}. {e}");
                return Ok(None);
            },
        };
        let unchanged = status.status == PaymentStatus::Pending &&
            status.confirmations.unwrap_or_default() <= record.xrpl_confirmations.unwrap_or_default();
        if unchanged {
            trace!("🔄️ {link_payment_id} is still pending");
            return Ok(None);
        }
        let event = WebhookEvent {
            event: RESYNC_EVENT.to_string(),
            link_payment_id: link_payment_id.clone(),
            order_id: Some(record.order_id.clone()),
            amount: Some(record.amount.to_string()),
            currency: Some(record.currency.to_string()),
            status: status.status,
            xrpl_tx_hash: status.xrpl_tx_hash,
            confirmations: status.confirmations,
            timestamp: None,
        };
        let payload = serde_json::to_string(&event).map_err(|e| ReconciliationError::MalformedPayload(e.to_string()))?;
        let log = self
            .db
            .insert_webhook_log(NewWebhookLog {
                event: RESYNC_EVENT.to_string(),
                payload,
                link_payment_id: Some(link_payment_id),
                shop: Some(record.shop.clone()),
                error: None,
            })
            .await?;
        self.apply_event(log.id, event).await.map(Some)
    }

    /// Resyncs up to `limit` pending payments created before `older_than`. Failures are logged and skipped.
    pub async fn resync_stale_payments(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<WebhookOutcome>, ReconciliationError> {
        let stale = self.db.fetch_stale_pending(older_than, limit).await?;
        debug!("🔄️ {} stale pending payments to resync", stale.len());
        let mut outcomes = Vec::with_capacity(stale.len());
        for record in stale {
            match self.resync_payment(&record).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {},
                Err(e) => warn!("🔄️ Resync of payment #{} failed. {e}", record.id),
            }
        }
        Ok(outcomes)
    }

    async fn ignore_duplicate(
        &self,
        log_id: i64,
        record: PaymentRecord,
        event: &WebhookEvent,
    ) -> Result<WebhookOutcome, ReconciliationError> {
        info!(
            "🔄️ Payment {} is already {}. Ignoring {} notification.",
            event.link_payment_id, record.status, event.status
        );
        let details = json!({
            "receivedStatus": event.status,
            "currentStatus": record.status,
            "event": event.event,
        });
        self.db.append_history(record.id, NewHistoryEntry::new(HistoryAction::DuplicateIgnored, details)).await?;
        self.mark_processed(log_id, Some(&record.shop), None).await;
        Ok(WebhookOutcome::Duplicate(record))
    }

    async fn finalize(
        &self,
        log_id: i64,
        record: PaymentRecord,
        tx_hash: String,
    ) -> Result<WebhookOutcome, ReconciliationError> {
        let result = match self.settings.order_model {
            OrderModel::Draft => self.complete_draft(&record, &tx_hash).await,
            OrderModel::Legacy => self.mark_paid(&record, &tx_hash).await,
        };
        match result {
            Ok(record) => {
                self.mark_processed(log_id, Some(&record.shop), None).await;
                Ok(WebhookOutcome::OrderFinalized(record))
            },
            Err(reason) => {
                warn!("🔄️ Payment {} completed, but the order could not be finalised. {reason}", record.order_name);
                self.mark_failed(log_id, Some(&record.shop), &reason).await;
                let entry = NewHistoryEntry::new(HistoryAction::OrderCompletionFailed, json!({ "error": reason }));
                if let Err(e) = self.db.append_history(record.id, entry).await {
                    error!("🔄️ Could not record the order failure for payment #{}. {e}", record.id);
                }
                let record = self.db.fetch_payment(record.id).await?.unwrap_or(record);
                Ok(WebhookOutcome::OrderFinalizationFailed { record, reason })
            },
        }
    }

    async fn complete_draft(&self, record: &PaymentRecord, tx_hash: &str) -> Result<PaymentRecord, String> {
        let draft_order_id =
            record.draft_order_id.as_deref().ok_or_else(|| "No draft order exists for this payment".to_string())?;
        let order = self
            .gateway_call(self.gateway.complete_draft_order(&record.shop, draft_order_id))
            .await
            .map_err(|e| format!("Draft order {draft_order_id} could not be completed. {e}"))?;
        info!("🔄️ Draft order {draft_order_id} completed as order {}", order.order_name);
        let entry = NewHistoryEntry::new(
            HistoryAction::OrderCreated,
            json!({ "orderId": order.order_id, "orderName": order.order_name, "draftOrderId": draft_order_id }),
        );
        let updated = self
            .db
            .record_actual_order(record.id, order.clone(), entry)
            .await
            .map_err(|e| format!("Order {} was created but could not be saved. {e}", order.order_name))?
            .unwrap_or_else(|| record.clone());
        let annotation = OrderAnnotation {
            xrpl_tx_hash: tx_hash.to_string(),
            payment_method: PAYMENT_METHOD.to_string(),
            confirmations: updated.xrpl_confirmations.unwrap_or_default(),
            note: payment_note(&updated, tx_hash),
        };
        if let Err(e) = self.gateway_call(self.gateway.annotate_order(&record.shop, &order.order_id, &annotation)).await {
            warn!("🔄️ Could not add payment details to order {}. {e}", order.order_name);
        }
        Ok(updated)
    }

    async fn mark_paid(&self, record: &PaymentRecord, tx_hash: &str) -> Result<PaymentRecord, String> {
        let paid = PaidOrder {
            order_id: record.order_id.clone(),
            amount: record.amount.clone(),
            currency: record.currency,
            xrpl_tx_hash: tx_hash.to_string(),
            note: payment_note(record, tx_hash),
        };
        self.gateway_call(self.gateway.mark_order_as_paid(&record.shop, &paid))
            .await
            .map_err(|e| format!("Order {} could not be marked as paid. {e}", record.order_name))?;
        let entry = NewHistoryEntry::new(HistoryAction::Updated, json!({ "orderMarkedPaid": record.order_id }));
        if let Err(e) = self.db.append_history(record.id, entry).await {
            error!("🔄️ Could not record that order {} was paid. {e}", record.order_name);
        }
        Ok(record.clone())
    }

    async fn clean_up(&self, log_id: i64, record: PaymentRecord) -> Result<WebhookOutcome, ReconciliationError> {
        let warning = match self.settings.order_model {
            OrderModel::Draft => match record.draft_order_id.as_deref() {
                Some(draft_order_id) => {
                    match self.gateway_call(self.gateway.delete_draft_order(&record.shop, draft_order_id)).await {
                        Ok(()) => {
                            let entry = NewHistoryEntry::new(
                                HistoryAction::DraftDeleted,
                                json!({ "draftOrderId": draft_order_id }),
                            );
                            self.db.append_history(record.id, entry).await?;
                            None
                        },
                        Err(e) => Some(format!("Draft order {draft_order_id} could not be deleted. {e}")),
                    }
                },
                None => None,
            },
            OrderModel::Legacy => {
                let reason = format!("Payment {0}: LINK payment was {0}", record.status);
                self.gateway_call(self.gateway.cancel_order(&record.shop, &record.order_id, &reason))
                    .await
                    .err()
                    .map(|e| format!("Order {} could not be cancelled. {e}", record.order_name))
            },
        };
        if let Some(w) = &warning {
            warn!("🔄️ {w}");
        }
        self.mark_processed(log_id, Some(&record.shop), warning.as_deref()).await;
        let record = self.db.fetch_payment(record.id).await?.unwrap_or(record);
        Ok(WebhookOutcome::CleanedUp { record, warning })
    }

    async fn gateway_call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        bounded(self.settings.upstream_timeout, call, || GatewayError::Timeout).await
    }

    async fn mark_processed(&self, log_id: i64, shop: Option<&str>, error: Option<&str>) {
        if let Err(e) = self.db.mark_webhook_processed(log_id, shop, error).await {
            error!("🔄️ Could not update webhook log #{log_id}. {e}");
        }
    }

    async fn mark_failed(&self, log_id: i64, shop: Option<&str>, error: &str) {
        if let Err(e) = self.db.mark_webhook_failed(log_id, shop, error).await {
            error!("🔄️ Could not update webhook log #{log_id}. {e}");
        }
    }
}

fn event_details(event: &WebhookEvent) -> Value {
    json!({
        "event": event.event,
        "status": event.status,
        "xrplTxHash": event.tx_hash(),
        "confirmations": event.confirmations,
        "timestamp": event.timestamp,
    })
}

/// The order note that records how an order was paid.
pub fn payment_note(record: &PaymentRecord, tx_hash: &str) -> String {
    format!(
        "XRPL Payment Completed\nTransaction Hash: {tx_hash}\nAmount: {} {}\nConfirmations: {}\nNetwork: XRPL Mainnet",
        record.amount,
        record.currency,
        record.xrpl_confirmations.unwrap_or_default()
    )
}
