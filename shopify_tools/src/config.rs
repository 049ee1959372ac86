use log::*;
use lpg_common::Secret;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-04";

/// Connection details for a single shop. The payment gateway is multi-tenant, so one of these is built per call
/// from the shop's stored offline session.
#[derive(Debug, Clone, Default)]
pub struct ShopifyConfig {
    /// The shop domain, e.g. "my-shop.myshopify.com"
    pub shop: String,
    pub admin_access_token: Secret<String>,
    pub api_version: String,
}

impl ShopifyConfig {
    pub fn new<S: Into<String>>(shop: S, admin_access_token: Secret<String>, api_version: &str) -> Self {
        Self { shop: shop.into(), admin_access_token, api_version: api_version.to_string() }
    }

    /// The Admin API version to use, taken from `LPG_SHOPIFY_API_VERSION`.
    pub fn api_version_from_env_or_default() -> String {
        std::env::var("LPG_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("LPG_SHOPIFY_API_VERSION not set, using {DEFAULT_SHOPIFY_API_VERSION} as default");
            DEFAULT_SHOPIFY_API_VERSION.to_string()
        })
    }
}
