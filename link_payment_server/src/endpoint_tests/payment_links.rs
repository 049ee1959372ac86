use actix_web::{
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use link_payment_engine::{
    db_types::{DraftOrderRef, ReserveResult},
    PaymentLinkApi,
    PaymentLinkSettings,
};
use lpg_common::PaymentStatus;
use serde_json::{json, Value};

use super::{
    helpers::{send_request, session_token, verifier, SHOP},
    mocks::{merchant_config, payment_record, FakeProcessor, MockGateway, MockPaymentStore},
};
use crate::{
    routes::{create_payment_preflight, CreatePaymentRoute},
    server::cors_headers,
};

const PATH: &str = "/api/payment/create";

fn checkout_body() -> Value {
    json!({
        "orderId": "co_1",
        "orderName": "#1001",
        "amount": "25.00",
        "currency": "RLUSD",
        "email": "ada@example.com"
    })
}

fn configure(
    store: MockPaymentStore,
    processor: FakeProcessor,
    gateway: MockGateway,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentLinkApi::new(store, processor, gateway, PaymentLinkSettings::default());
        cfg.app_data(verifier())
            .app_data(web::Data::new(api))
            .service(CreatePaymentRoute::<MockPaymentStore, FakeProcessor, MockGateway>::new());
    }
}

fn post(token: Option<&str>, body: Value) -> TestRequest {
    let req = TestRequest::post().uri(PATH).set_json(body);
    match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        None => req,
    }
}

#[actix_web::test]
async fn create_payment_without_token() {
    let _ = env_logger::try_init().ok();
    let processor = FakeProcessor::default();
    let config = configure(MockPaymentStore::new(), processor.clone(), MockGateway::new());
    let (status, body) = send_request(post(None, checkout_body()), config).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No session token was provided."}"#);
    assert_eq!(processor.count(), 0);
}

#[actix_web::test]
async fn create_payment_with_tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = session_token(SHOP);
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    let (status, body) = send_request(
        post(Some(&token), checkout_body()),
        configure(MockPaymentStore::new(), FakeProcessor::default(), MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Session token is invalid"), "{body}");
}

#[actix_web::test]
async fn create_payment_rejects_unsupported_currency() {
    let _ = env_logger::try_init().ok();
    let token = session_token(SHOP);
    let mut body = checkout_body();
    body["currency"] = json!("XRP");
    // Validation happens before the store is touched, so no expectations are set
    let config = configure(MockPaymentStore::new(), FakeProcessor::default(), MockGateway::new());
    let (status, body) = send_request(post(Some(&token), body), config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("XRP is not a supported currency"), "{body}");
}

#[actix_web::test]
async fn create_payment_rejects_malformed_json() {
    let _ = env_logger::try_init().ok();
    let token = session_token(SHOP);
    let req = TestRequest::post()
        .uri(PATH)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"orderId\": ");
    let (status, body) =
        send_request(req, configure(MockPaymentStore::new(), FakeProcessor::default(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
}

#[actix_web::test]
async fn create_payment_for_unconfigured_shop() {
    let _ = env_logger::try_init().ok();
    let token = session_token(SHOP);
    let mut store = MockPaymentStore::new();
    store.expect_fetch_merchant_config().times(1).returning(|_| Ok(Some(merchant_config(false))));
    let config = configure(store, FakeProcessor::default(), MockGateway::new());
    let (status, body) = send_request(post(Some(&token), checkout_body()), config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"LINK payments are not configured for my-shop.myshopify.com"}"#);
}

#[actix_web::test]
async fn create_payment_reuses_existing_link() {
    let _ = env_logger::try_init().ok();
    let token = session_token(SHOP);
    let processor = FakeProcessor::default();
    let mut store = MockPaymentStore::new();
    store.expect_fetch_merchant_config().withf(|shop| shop == SHOP).returning(|_| Ok(Some(merchant_config(true))));
    store
        .expect_find_by_shop_and_order()
        .withf(|shop, order_id, statuses| {
            shop == SHOP && order_id == "co_1" && statuses.contains(&PaymentStatus::Pending)
        })
        .times(1)
        .returning(|_, _, _| Ok(Some(payment_record(3, Some("lp_existing")))));
    let config = configure(store, processor.clone(), MockGateway::new());
    let (status, body) = send_request(post(Some(&token), checkout_body()), config).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["paymentId"], json!("lp_existing"));
    assert_eq!(body["paymentUrl"], json!("https://pay.link.xyz/lp_existing"));
    assert_eq!(body["draftOrderId"], json!("gid://shopify/DraftOrder/7"));
    assert_eq!(processor.count(), 0);
}

#[actix_web::test]
async fn create_payment_creates_link_and_draft_order() {
    let _ = env_logger::try_init().ok();
    let token = session_token(SHOP);
    let processor = FakeProcessor::default();
    let mut store = MockPaymentStore::new();
    store.expect_fetch_merchant_config().returning(|_| Ok(Some(merchant_config(true))));
    store.expect_find_by_shop_and_order().returning(|_, _, _| Ok(None));
    store
        .expect_reserve_checkout()
        .withf(|r| r.shop == SHOP && r.order_id == "co_1" && r.amount.as_str() == "25.00")
        .times(1)
        .returning(|_| Ok(ReserveResult::Reserved(payment_record(9, None))));
    store
        .expect_upsert_by_link_payment_id()
        .withf(|id, doc| *id == 9 && doc.link_payment_id == "lp_1" && doc.draft_order.is_some())
        .times(1)
        .returning(|_, doc| {
            let mut record = payment_record(9, Some(&doc.link_payment_id));
            record.draft_order_id = doc.draft_order.map(|d| d.draft_order_id);
            Ok(record)
        });
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_draft_order()
        .withf(|shop, req| shop == SHOP && req.link_payment_id == "lp_1" && req.order_name == "#1001")
        .times(1)
        .returning(|_, _| {
            Ok(DraftOrderRef { draft_order_id: "gid://shopify/DraftOrder/11".into(), draft_order_url: None })
        });
    let (status, body) =
        send_request(post(Some(&token), checkout_body()), configure(store, processor.clone(), gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["paymentId"], json!("lp_1"));
    assert_eq!(body["paymentUrl"], json!("https://pay.link.xyz/lp_1"));
    assert_eq!(body["draftOrderId"], json!("gid://shopify/DraftOrder/11"));
    assert_eq!(processor.count(), 1);
}

#[actix_web::test]
async fn create_payment_preflight_has_cors_headers() {
    let app = test::init_service(
        App::new().wrap(cors_headers()).route(PATH, web::method(Method::OPTIONS).to(create_payment_preflight)),
    )
    .await;
    let req = TestRequest::default().method(Method::OPTIONS).uri(PATH).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let headers = res.headers();
    assert_eq!(headers.get("Access-Control-Allow-Origin").unwrap(), "*");
    assert_eq!(headers.get("Access-Control-Allow-Methods").unwrap(), "GET, POST, OPTIONS");
}
