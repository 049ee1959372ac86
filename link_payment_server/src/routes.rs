//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database, LINK or Shopify, so they
//! are all async, and every upstream call is bounded by the configured upstream timeout.
use actix_web::{get, http::header::HeaderMap, web, HttpRequest, HttpResponse, Responder};
use link_payment_engine::{
    traits::{
        CommerceGateway,
        MerchantManagement,
        PaymentProcessor,
        PaymentRecordManagement,
        SessionManagement,
        WebhookLogManagement,
    },
    CheckoutRequest,
    PaymentLinkApi,
    ReconciliationApi,
};
use link_tools::LINK_SIGNATURE_HEADER;
use log::*;

use crate::{
    auth::CheckoutSession,
    data_objects::{CreatePaymentParams, CreatePaymentResponse, ScopesUpdatePayload, WebhookReceipt},
    errors::ServerError,
    helpers::sanitize_shop,
};

pub const SHOPIFY_SHOP_HEADER: &str = "X-Shopify-Shop-Domain";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal <$($param:ident : $bound:ident $(+ $extra:ident)*),+>) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param,)+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param,)+> [<$name:camel Route>]<$($param,)+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param,)+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param,)+>
        where
            $($param: $bound $(+ $extra)* + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param,)+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payment links  ----------------------------------------------------
route!(create_payment => Post "/api/payment/create" <
    B: PaymentRecordManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway
>);
/// Route handler for payment link creation.
///
/// Called by the checkout UI extension with a Shopify session token. The shop is taken from the token, never from
/// the body. Calling this again for the same order returns the same link.
pub async fn create_payment<B, P, G>(
    session: CheckoutSession,
    body: web::Json<CreatePaymentParams>,
    api: web::Data<PaymentLinkApi<B, P, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentRecordManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway,
{
    let request = CheckoutRequest::from(body.into_inner());
    debug!("💻️ POST payment link for {}/{}", session.shop, request.order_name);
    let response = api.create_payment_link(&session.shop, request).await.map_err(|e| {
        warn!("💻️ Could not create payment link for {}. {e}", session.shop);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(CreatePaymentResponse::from(response)))
}

/// CORS preflight for the checkout extension. The CORS headers themselves are added to every response by the server.
pub async fn create_payment_preflight() -> impl Responder {
    trace!("💻️ Received CORS preflight for payment link creation");
    HttpResponse::NoContent().finish()
}

//----------------------------------------------   LINK webhooks  ----------------------------------------------------
route!(link_webhook => Post "/api/webhooks/link" <
    B: PaymentRecordManagement + WebhookLogManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway
>);
/// Route handler for LINK payment notifications.
///
/// The body is taken as raw bytes, since the signature covers the exact bytes LINK sent. Once the payment itself has
/// been recorded, the response is always a 200, even if the Shopify side failed. Those failures come back as a
/// `warning` and are kept in the webhook log.
pub async fn link_webhook<B, P, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, P, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentRecordManagement + WebhookLogManagement + MerchantManagement,
    P: PaymentProcessor,
    G: CommerceGateway,
{
    trace!("💻️ Received LINK webhook ({} bytes)", body.len());
    let signature = header_value(req.headers(), LINK_SIGNATURE_HEADER);
    let outcome = api.process_webhook(body.as_ref(), signature).await?;
    let receipt = WebhookReceipt::from(&outcome);
    if let Some(warning) = &receipt.warning {
        warn!("💻️ LINK webhook for payment #{} acknowledged with a warning. {warning}", outcome.record().id);
    }
    Ok(HttpResponse::Ok().json(receipt))
}

//----------------------------------------------   Shopify app webhooks  ---------------------------------------------
route!(app_uninstalled => Post "/webhooks/app_uninstalled" <B: SessionManagement>);
/// Shopify's `app/uninstalled` webhook. The shop's sessions are useless once the app is gone.
pub async fn app_uninstalled<B: SessionManagement>(
    req: HttpRequest,
    sessions: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let shop = webhook_shop(&req)?;
    let deleted = sessions.delete_sessions_for_shop(&shop).await?;
    info!("💻️ App uninstalled from {shop}. {deleted} sessions deleted.");
    Ok(HttpResponse::Ok().finish())
}

route!(scopes_update => Post "/webhooks/scopes_update" <B: SessionManagement>);
/// Shopify's `app/scopes_update` webhook. The new scope list is stored on the shop's offline session.
pub async fn scopes_update<B: SessionManagement>(
    req: HttpRequest,
    body: web::Json<ScopesUpdatePayload>,
    sessions: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let shop = webhook_shop(&req)?;
    let scope = body.current.join(",");
    match sessions.fetch_offline_session(&shop).await? {
        Some(session) => {
            sessions.update_session_scope(&session.id, &scope).await?;
            info!("💻️ Scopes for {shop} updated to [{scope}]");
        },
        None => info!("💻️ Scopes update for {shop} ignored. The shop has no session."),
    }
    Ok(HttpResponse::Ok().finish())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn webhook_shop(req: &HttpRequest) -> Result<String, ServerError> {
    header_value(req.headers(), SHOPIFY_SHOP_HEADER)
        .and_then(sanitize_shop)
        .ok_or_else(|| ServerError::InvalidRequestBody(format!("Missing or invalid {SHOPIFY_SHOP_HEADER} header")))
}
