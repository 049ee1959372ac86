//! # LINK tools
//!
//! Client for the LINK payment processor. LINK issues hosted checkout links that accept RLUSD or USDC and settle on
//! the XRP Ledger, then reports progress back to us through signed webhooks.
//!
//! * [`LinkApi`] creates payment links and looks up payment status.
//! * [`verify_webhook_signature`] authenticates incoming webhook bodies.
mod api;
mod config;
mod error;
mod signature;

pub mod data_objects;

pub use api::LinkApi;
pub use config::{LinkConfig, DEFAULT_LINK_API_URL, DEFAULT_LINK_TIMEOUT};
pub use data_objects::{CreatePaymentLinkRequest, PaymentLink, PaymentStatusReport};
pub use error::LinkApiError;
pub use signature::{sign_webhook_payload, verify_webhook_signature, LINK_SIGNATURE_HEADER};
