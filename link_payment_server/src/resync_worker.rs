use std::time::Duration;

use chrono::Utc;
use link_payment_engine::{
    traits::{CommerceGateway, MerchantManagement, PaymentProcessor, PaymentRecordManagement, WebhookLogManagement},
    ReconciliationApi,
    WebhookOutcome,
};
use log::*;
use tokio::task::JoinHandle;

/// Upper bound on the number of payments looked at in a single pass.
pub const RESYNC_BATCH_SIZE: i64 = 50;

/// Starts the resync worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, payments that have been pending for longer than `stale_after` are checked against LINK. Anything
/// LINK reports as changed goes through the same state machine as a webhook would, so a lost webhook can never leave
/// a paid order unfinished.
pub fn start_resync_worker<B, P, G>(
    api: ReconciliationApi<B, P, G>,
    interval: Duration,
    stale_after: Duration,
) -> JoinHandle<()>
where
    B: PaymentRecordManagement + WebhookLogManagement + MerchantManagement + 'static,
    P: PaymentProcessor + 'static,
    G: CommerceGateway + 'static,
{
    // The engine's futures are not Send, so the worker runs on the server's local task set
    actix_web::rt::spawn(run_resync_loop(api, interval, stale_after))
}

async fn run_resync_loop<B, P, G>(api: ReconciliationApi<B, P, G>, interval: Duration, stale_after: Duration)
where
    B: PaymentRecordManagement + WebhookLogManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway,
{
    let mut timer = tokio::time::interval(interval);
    info!("🕰️ Payment resync worker started. Running every {}s", interval.as_secs());
    loop {
        timer.tick().await;
        let older_than = match chrono::Duration::from_std(stale_after) {
            Ok(age) => Utc::now() - age,
            Err(e) => {
                error!("🕰️ Invalid stale payment age. {e}. Stopping the resync worker.");
                return;
            },
        };
        debug!("🕰️ Running payment resync job");
        match api.resync_stale_payments(older_than, RESYNC_BATCH_SIZE).await {
            Ok(outcomes) if outcomes.is_empty() => trace!("🕰️ No pending payments have changed"),
            Ok(outcomes) => {
                info!("🕰️ {} pending payments updated from LINK", outcomes.len());
                debug!("🕰️ Resynced payments: {}", outcome_list(&outcomes));
            },
            Err(e) => {
                error!("🕰️ Error running payment resync job: {e}");
            },
        }
    }
}

fn outcome_list(outcomes: &[WebhookOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| {
            let r = o.record();
            format!("[{}] {} {}/{}: {}", r.id, r.link_payment_id.as_deref().unwrap_or("-"), r.shop, r.order_name, r.status)
        })
        .collect::<Vec<String>>()
        .join(", ")
}
