//! # LINK payment gateway server
//!
//! This crate hosts the HTTP surface of the LINK payment gateway. It is responsible for:
//! * Issuing LINK payment links for Shopify checkouts, on behalf of the checkout UI extension.
//! * Receiving LINK payment webhooks and handing them to the reconciliation engine.
//! * Receiving Shopify app lifecycle webhooks (uninstall, scope changes).
//! * Periodically resyncing payments that never received a webhook.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/payment/create`: Create (or re-use) a payment link for a checkout.
//! * `POST /api/webhooks/link`: LINK payment status notifications.
//! * `POST /shopify/webhooks/app_uninstalled`, `POST /shopify/webhooks/scopes_update`: Shopify app webhooks.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod resync_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
