use std::{env, str::FromStr, time::Duration};

use link_payment_engine::{
    sqlite::db::db_url,
    OrderModel,
    PaymentLinkSettings,
    ReconciliationSettings,
    DEFAULT_RESERVATION_TIMEOUT,
    DEFAULT_UPSTREAM_TIMEOUT,
};
use link_tools::{LinkConfig, DEFAULT_LINK_API_URL};
use log::*;
use lpg_common::{parse_boolean_flag, Secret};
use shopify_tools::ShopifyConfig as ShopifyApiConfig;

const DEFAULT_LPG_HOST: &str = "127.0.0.1";
const DEFAULT_LPG_PORT: u16 = 8360;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_STALE_PAYMENT_AGE: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// The public url of this server, without a trailing slash. LINK redirects shoppers back here, and posts its
    /// webhooks to `{app_url}/api/webhooks/link`.
    pub app_url: String,
    /// Which Shopify order flow the deployment uses.
    pub order_model: OrderModel,
    /// Upper bound on every call to LINK or Shopify.
    pub upstream_timeout: Duration,
    pub link: LinkSettings,
    pub shopify: ShopifyConfig,
    /// If set, pending payments are resynced with LINK this often.
    pub resync_interval: Option<Duration>,
    /// Only payments that have been pending at least this long are resynced.
    pub stale_payment_age: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct LinkSettings {
    pub api_url: String,
    /// Shared secret for the `x-link-signature` webhook header. If empty, every webhook is refused.
    pub webhook_secret: Secret<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ShopifyConfig {
    /// The app's client id. Checkout session tokens are issued with this as their audience.
    pub api_key: String,
    /// The app's client secret. Signs checkout session tokens and webhook HMACs.
    pub api_secret: Secret<String>,
    pub api_version: String,
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPG_HOST.to_string(),
            port: DEFAULT_LPG_PORT,
            database_url: String::default(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            app_url: format!("http://{DEFAULT_LPG_HOST}:{DEFAULT_LPG_PORT}"),
            order_model: OrderModel::default(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            link: LinkSettings { api_url: DEFAULT_LINK_API_URL.to_string(), webhook_secret: Secret::default() },
            shopify: ShopifyConfig::default(),
            resync_interval: None,
            stale_payment_age: DEFAULT_STALE_PAYMENT_AGE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, app_url: format!("http://{host}:{port}"), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPG_HOST").ok().unwrap_or_else(|| DEFAULT_LPG_HOST.into());
        let port = env::var("LPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LPG_PORT. {e} Using the default, {DEFAULT_LPG_PORT}, instead."
                    );
                    DEFAULT_LPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LPG_PORT);
        let database_url = db_url();
        let db_max_connections = parse_env("LPG_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let app_url = env::var("LPG_APP_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .ok()
            .unwrap_or_else(|| {
                warn!(
                    "🪛️ LPG_APP_URL is not set. LINK will not be able to reach this server unless it is running on \
                     http://{host}:{port}."
                );
                format!("http://{host}:{port}")
            });
        let order_model = env::var("LPG_ORDER_MODEL")
            .map_err(|_| info!("🪛️ LPG_ORDER_MODEL is not set. Using the {} order model.", OrderModel::default()))
            .and_then(|s| {
                OrderModel::from_str(&s).map_err(|e| warn!("🪛️ Invalid configuration value for LPG_ORDER_MODEL. {e}"))
            })
            .unwrap_or_default();
        let upstream_timeout =
            Duration::from_secs(parse_env("LPG_UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT.as_secs()));
        let resync_interval = env::var("LPG_RESYNC_INTERVAL_SECS")
            .map_err(|_| info!("🪛️ LPG_RESYNC_INTERVAL_SECS is not set. The resync worker is disabled."))
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for LPG_RESYNC_INTERVAL_SECS. {e}"))
            })
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        let stale_payment_age =
            Duration::from_secs(60 * parse_env("LPG_STALE_PAYMENT_AGE_MINS", DEFAULT_STALE_PAYMENT_AGE.as_secs() / 60));
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            app_url,
            order_model,
            upstream_timeout,
            link: LinkSettings::from_env_or_defaults(),
            shopify: ShopifyConfig::from_env_or_defaults(),
            resync_interval,
            stale_payment_age,
        }
    }

    pub fn payment_link_settings(&self) -> PaymentLinkSettings {
        PaymentLinkSettings {
            app_url: self.app_url.clone(),
            order_model: self.order_model,
            upstream_timeout: self.upstream_timeout,
            reservation_timeout: DEFAULT_RESERVATION_TIMEOUT,
        }
    }

    pub fn reconciliation_settings(&self) -> ReconciliationSettings {
        ReconciliationSettings { order_model: self.order_model, upstream_timeout: self.upstream_timeout }
    }

    pub fn link_api_config(&self) -> LinkConfig {
        LinkConfig::new(&self.link.api_url, self.upstream_timeout)
    }
}

impl LinkSettings {
    pub fn from_env_or_defaults() -> Self {
        let api_url = LinkConfig::new_from_env_or_default().base_url;
        let webhook_secret = env::var("LPG_LINK_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ LPG_LINK_WEBHOOK_SECRET is not set. Every LINK webhook will be rejected until it is set to the \
                 signing secret from the LINK dashboard."
            );
            String::default()
        });
        Self { api_url, webhook_secret: Secret::new(webhook_secret) }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let api_key = env::var("LPG_SHOPIFY_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ LPG_SHOPIFY_API_KEY is not set. Please set it to the API key for your Shopify app.");
            String::default()
        });
        let api_secret = env::var("LPG_SHOPIFY_API_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ LPG_SHOPIFY_API_SECRET is not set. Please set it to the client secret for your Shopify app. \
                 Checkout requests will be refused until it is set."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("LPG_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Shopify webhook HMAC checks are disabled. Do not run a production instance like this. 🚨️");
        }
        Self {
            api_key,
            api_secret: Secret::new(api_secret),
            api_version: ShopifyApiConfig::api_version_from_env_or_default(),
            hmac_checks,
        }
    }

    /// Builds the Admin API client configuration for a shop, using the access token from its offline session.
    pub fn shopify_api_config(&self, shop: &str, access_token: &str) -> ShopifyApiConfig {
        ShopifyApiConfig::new(shop, Secret::new(access_token.to_string()), &self.api_version)
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
