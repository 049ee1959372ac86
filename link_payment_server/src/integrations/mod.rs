//! Concrete implementations of the engine's external contracts: LINK as the payment processor, and Shopify as the
//! commerce platform.
pub mod link;
pub mod shopify;

pub use link::LinkProcessor;
pub use shopify::ShopifyGateway;
