use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use link_payment_engine::{
    db_types::{
        ActualOrder,
        DraftOrderRef,
        HistoryAction,
        NewHistoryEntry,
        NewMerchantConfig,
        NewPaymentRecord,
        PaymentLinkDocument,
        PaymentRecord,
        ReserveResult,
    },
    traits::{GatewayError, MerchantManagement, PaymentRecordManagement, WebhookLogManagement},
    ReconciliationApi,
    ReconciliationSettings,
    SqliteDatabase,
};
use link_tools::LINK_SIGNATURE_HEADER;
use lpg_common::{Currency, PaymentStatus};
use serde_json::json;

use super::{
    helpers::{prepare_test_db, send_request, SHOP},
    mocks::{FakeProcessor, MockGateway, VALID_SIGNATURE},
};
use crate::routes::LinkWebhookRoute;

const PATH: &str = "/api/webhooks/link";
const TX_HASH: &str = "E3FE6EA3D48F0C2B639448020EA4F03D4F4F8FFDB243A852A0F59177921B4879";

fn configure(db: SqliteDatabase, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReconciliationApi::new(db, FakeProcessor::default(), gateway, ReconciliationSettings::default());
        cfg.app_data(web::Data::new(api))
            .service(LinkWebhookRoute::<SqliteDatabase, FakeProcessor, MockGateway>::new());
    }
}

fn webhook(link_payment_id: &str, status: &str, tx_hash: Option<&str>, signature: Option<&str>) -> TestRequest {
    let body = json!({
        "event": format!("payment.{status}"),
        "linkPaymentId": link_payment_id,
        "status": status,
        "xrplTxHash": tx_hash,
        "confirmations": tx_hash.map(|_| 3),
        "timestamp": "2024-06-01T12:00:00Z"
    })
    .to_string();
    let req = TestRequest::post().uri(PATH).insert_header(("Content-Type", "application/json")).set_payload(body);
    match signature {
        Some(sig) => req.insert_header((LINK_SIGNATURE_HEADER, sig)),
        None => req,
    }
}

async fn seed_payment(db: &SqliteDatabase, link_payment_id: &str) -> PaymentRecord {
    let merchant = NewMerchantConfig {
        shop: SHOP.into(),
        link_business_id: "biz_42".into(),
        xrpl_address: "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH".into(),
        enabled: true,
    };
    db.upsert_merchant_config(merchant).await.expect("Error saving merchant config");
    let record = NewPaymentRecord {
        shop: SHOP.into(),
        order_id: "co_1".into(),
        order_name: "#1001".into(),
        amount: "25.00".parse().unwrap(),
        currency: Currency::Rlusd,
        order_details: None,
    };
    let ReserveResult::Reserved(reserved) = db.reserve_checkout(record).await.expect("Error reserving checkout") else {
        panic!("Order co_1 is already reserved");
    };
    let doc = PaymentLinkDocument {
        link_payment_id: link_payment_id.into(),
        link_payment_url: format!("https://pay.link.xyz/{link_payment_id}"),
        draft_order: Some(DraftOrderRef { draft_order_id: "gid://shopify/DraftOrder/7".into(), draft_order_url: None }),
        history: NewHistoryEntry::new(HistoryAction::Created, json!({ "paymentId": link_payment_id })),
    };
    db.upsert_by_link_payment_id(reserved.id, doc).await.expect("Error saving payment link")
}

#[actix_web::test]
async fn webhook_with_bad_signature() {
    let test_db = prepare_test_db().await;
    let db = test_db.db.clone();
    let req = webhook("lp_1", "completed", Some(TX_HASH), Some("t=1,v1=bad"));
    let (status, body) = send_request(req, configure(db, MockGateway::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Invalid webhook signature"}"#);
    let log = test_db.db.fetch_webhook_log(1).await.unwrap().expect("Rejected webhook was not logged");
    assert_eq!(log.event, "signature_invalid");
    assert!(!log.processed);
    assert!(log.error.is_some());
}

#[actix_web::test]
async fn webhook_without_signature() {
    let test_db = prepare_test_db().await;
    let req = webhook("lp_1", "completed", None, None);
    let (status, _) = send_request(req, configure(test_db.db.clone(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_for_unknown_payment() {
    let test_db = prepare_test_db().await;
    let (status, body) = send_request(
        webhook("lp_nope", "completed", Some(TX_HASH), Some(VALID_SIGNATURE)),
        configure(test_db.db.clone(), MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"No payment exists for LINK payment lp_nope"}"#);
    let log = test_db.db.fetch_webhook_log(1).await.unwrap().unwrap();
    assert_eq!(log.link_payment_id.as_deref(), Some("lp_nope"));
    assert_eq!(log.error.as_deref(), Some("Payment not found"));
}

#[actix_web::test]
async fn malformed_webhook_payload() {
    let test_db = prepare_test_db().await;
    let req = TestRequest::post()
        .uri(PATH)
        .insert_header((LINK_SIGNATURE_HEADER, VALID_SIGNATURE))
        .set_payload(r#"{"linkPaymentId": "lp_1", "status": "refunded"}"#);
    let (status, body) = send_request(req, configure(test_db.db.clone(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not decode webhook payload"), "{body}");
}

#[actix_web::test]
async fn completed_payment_finalizes_draft_order() {
    let test_db = prepare_test_db().await;
    let record = seed_payment(&test_db.db, "lp_1").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_complete_draft_order()
        .withf(|shop, id| shop == SHOP && id == "gid://shopify/DraftOrder/7")
        .times(1)
        .returning(|_, _| Ok(ActualOrder { order_id: "gid://shopify/Order/99".into(), order_name: "#1001".into() }));
    gateway
        .expect_annotate_order()
        .withf(|_, order_id, a| order_id == "gid://shopify/Order/99" && a.xrpl_tx_hash == TX_HASH)
        .times(1)
        .returning(|_, _, _| Ok(()));
    let (status, body) = send_request(
        webhook("lp_1", "completed", Some(TX_HASH), Some(VALID_SIGNATURE)),
        configure(test_db.db.clone(), gateway),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
    let record = test_db.db.fetch_payment(record.id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert_eq!(record.xrpl_tx_hash.as_deref(), Some(TX_HASH));
    assert_eq!(record.actual_order_id.as_deref(), Some("gid://shopify/Order/99"));
    assert!(record.paid_at.is_some());
}

#[actix_web::test]
async fn order_failure_is_acknowledged_with_a_warning() {
    let test_db = prepare_test_db().await;
    let record = seed_payment(&test_db.db, "lp_1").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_complete_draft_order()
        .times(1)
        .returning(|_, _| Err(GatewayError::Unavailable("Shopify is down".into())));
    let (status, body) = send_request(
        webhook("lp_1", "completed", Some(TX_HASH), Some(VALID_SIGNATURE)),
        configure(test_db.db.clone(), gateway),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["received"], json!(true));
    assert!(body["warning"].as_str().unwrap().starts_with("Payment recorded but order creation failed"));
    let record = test_db.db.fetch_payment(record.id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert!(record.actual_order_id.is_none());
}

#[actix_web::test]
async fn duplicate_webhook_is_ignored() {
    let test_db = prepare_test_db().await;
    let seeded = seed_payment(&test_db.db, "lp_1").await;
    // A failed payment leaves the draft order alone, so the gateway is never called
    let (status, _) = send_request(
        webhook("lp_1", "failed", None, Some(VALID_SIGNATURE)),
        configure(test_db.db.clone(), MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_request(
        webhook("lp_1", "completed", Some(TX_HASH), Some(VALID_SIGNATURE)),
        configure(test_db.db.clone(), MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
    let record = test_db.db.find_by_link_payment_id("lp_1").await.unwrap().unwrap();
    assert_eq!(record.id, seeded.id);
    assert_eq!(record.status, PaymentStatus::Failed);
    assert!(record.xrpl_tx_hash.is_none());
    let actions = record.payment_history.iter().map(|e| e.action).collect::<Vec<_>>();
    assert!(actions.contains(&HistoryAction::DuplicateIgnored), "{actions:?}");
}
