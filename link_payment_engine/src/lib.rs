//! LINK Payment Engine
//!
//! The engine reconciles payments made through LINK, a stablecoin payment-link processor settling on the XRP Ledger,
//! with orders on a merchant's Shopify store. It is provider-agnostic: the processor, the commerce platform and the
//! database are all reached through the traits in [`traits`].
//!
//! The library is divided into three sections:
//! 1. Storage ([`mod@sqlite`]). Payment records, their history, the webhook audit log, merchant settings and shop
//!    sessions. The data types are defined in [`db_types`] and are public.
//! 2. Contracts ([`traits`]) for the storage backend and the two external services.
//! 3. The public API ([`PaymentLinkApi`] and [`ReconciliationApi`]).
pub mod db_types;
mod lpe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use lpe_api::{
    errors::{PaymentLinkError, ReconciliationError},
    link_objects::{
        bounded,
        CheckoutRequest,
        OrderModel,
        PaymentLinkResponse,
        WebhookOutcome,
        DEFAULT_RESERVATION_TIMEOUT,
        DEFAULT_UPSTREAM_TIMEOUT,
    },
    payment_link_api::{PaymentLinkApi, PaymentLinkSettings},
    reconciliation_api::{payment_note, ReconciliationApi, ReconciliationSettings, PAYMENT_METHOD},
};
