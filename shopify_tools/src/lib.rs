//! # Shopify tools
//!
//! A thin, typed client for the parts of the Shopify Admin API that the LINK payment gateway needs:
//!
//! * Draft orders (create, complete, fetch, delete) via GraphQL.
//! * Order annotation (`orderUpdate`) via GraphQL.
//! * Legacy order handling (cancel, mark as paid, replace the note) via REST.
//!
//! GraphQL mutations return their `userErrors` in-band. These are decoded once, here, into [`MutationOutcome`] so that
//! callers never have to inspect raw JSON.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::ShopifyApi;
pub use config::ShopifyConfig;
pub use data_objects::{
    AppliedDiscount,
    Attribute,
    CompletedDraftOrder,
    DraftLineItem,
    DraftOrder,
    DraftOrderInput,
    MailingAddress,
    MutationOutcome,
    OrderRef,
    ShippingLine,
    ShopifyOrder,
    ShopifyTransaction,
    UserError,
};
pub use error::ShopifyApiError;
