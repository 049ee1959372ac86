use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::{KeepAlive, Method},
    middleware::{DefaultHeaders, Logger},
    web,
    App,
    HttpRequest,
    HttpServer,
};
use link_payment_engine::{PaymentLinkApi, ReconciliationApi, SqliteDatabase};
use log::*;

use crate::{
    auth::SessionTokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::{LinkProcessor, ShopifyGateway},
    middleware::{HmacMiddlewareFactory, SHOPIFY_HMAC_HEADER},
    resync_worker::start_resync_worker,
    routes::{
        create_payment_preflight,
        health,
        AppUninstalledRoute,
        CreatePaymentRoute,
        LinkWebhookRoute,
        ScopesUpdateRoute,
    },
};

type Gateway = ShopifyGateway<SqliteDatabase>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let processor = LinkProcessor::new(config.link_api_config(), config.link.webhook_secret.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if let Some(interval) = config.resync_interval {
        let gateway = ShopifyGateway::new(db.clone(), config.shopify.clone());
        let api = ReconciliationApi::new(db.clone(), processor.clone(), gateway, config.reconciliation_settings());
        let _worker = start_resync_worker(api, interval, config.stale_payment_age);
    }
    let srv = create_server_instance(config, db.clone(), processor)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🗃️ Closing database connections");
    db.close().await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    processor: LinkProcessor,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let gateway = ShopifyGateway::new(db.clone(), config.shopify.clone());
        let link_api = PaymentLinkApi::new(db.clone(), processor.clone(), gateway.clone(), config.payment_link_settings());
        let reconciliation_api =
            ReconciliationApi::new(db.clone(), processor.clone(), gateway, config.reconciliation_settings());
        let verifier = SessionTokenVerifier::new(&config.shopify);
        let shopify_scope = web::scope("/shopify")
            .wrap(HmacMiddlewareFactory::new(
                SHOPIFY_HMAC_HEADER,
                config.shopify.api_secret.clone(),
                config.shopify.hmac_checks,
            ))
            .service(AppUninstalledRoute::<SqliteDatabase>::new())
            .service(ScopesUpdateRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(cors_headers())
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lpg::access_log"))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(link_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(db.clone()))
            .service(health)
            .service(CreatePaymentRoute::<SqliteDatabase, LinkProcessor, Gateway>::new())
            .route("/api/payment/create", web::method(Method::OPTIONS).to(create_payment_preflight))
            .service(LinkWebhookRoute::<SqliteDatabase, LinkProcessor, Gateway>::new())
            .service(shopify_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The checkout extension runs on Shopify's domain, so every response carries permissive CORS headers.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "*"))
}

/// Malformed JSON bodies get the same `{"error": ...}` response as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Could not deserialize request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}
