//! # Backend and integration contracts.
//!
//! The payment engine is storage- and vendor-agnostic. Everything it needs from the outside world is expressed as a
//! trait in this module:
//!
//! * [`PaymentRecordManagement`] stores payment records and their append-only history.
//! * [`WebhookLogManagement`] keeps the audit trail of every inbound processor notification.
//! * [`MerchantManagement`] holds per-shop payment settings.
//! * [`SessionManagement`] reads the OAuth sessions the Shopify install flow leaves behind.
//! * [`PaymentProcessor`] is the payment-link provider (LINK).
//! * [`CommerceGateway`] is the commerce platform (Shopify).
mod commerce_gateway;
mod merchants;
mod payment_processor;
mod payment_records;
mod sessions;
mod webhook_logs;

pub use commerce_gateway::{CommerceGateway, DraftOrderRequest, GatewayError, OrderAnnotation, PaidOrder};
pub use merchants::{MerchantConfigError, MerchantManagement};
pub use payment_processor::{PaymentLinkRequest, PaymentProcessor, ProcessorError, ProcessorLink, ProcessorStatus};
pub use payment_records::{PaymentRecordManagement, PaymentStoreError};
pub use sessions::{SessionError, SessionManagement};
pub use webhook_logs::{WebhookLogError, WebhookLogManagement};
