mod helpers;
mod mocks;

mod link_webhooks;
mod payment_links;
mod server_startup;
mod shopify_webhooks;
