//! # LINK payment engine public API
//!
//! * [`payment_link_api`] turns a storefront checkout into a payment link, reserving the order so that each order has at
//!   most one open payment.
//! * [`reconciliation_api`] applies processor notifications to payment records and finalises (or cleans up) the
//!   matching orders on the commerce platform.
//!
//! Both APIs are generic over a storage backend and the two external services, so any of them can be swapped for a
//! mock in tests:
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url("sqlite://data/link_gateway.db", 5).await?;
//! let api = ReconciliationApi::new(db, link_processor, shopify_gateway, ReconciliationSettings::default());
//! let outcome = api.process_webhook(&body, signature).await?;
//! ```
pub mod errors;
pub mod link_objects;
pub mod payment_link_api;
pub mod reconciliation_api;
