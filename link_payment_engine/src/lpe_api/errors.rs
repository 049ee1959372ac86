use thiserror::Error;

use crate::traits::{MerchantConfigError, PaymentStoreError, ProcessorError, WebhookLogError};

#[derive(Debug, Clone, Error)]
pub enum PaymentLinkError {
    #[error("Invalid checkout request. {0}")]
    Validation(String),
    #[error("LINK payments are not configured for {0}")]
    NotConfigured(String),
    #[error("The payment processor is unavailable. {0}")]
    ProcessorUnavailable(String),
    #[error("The payment processor rejected the request. {0}")]
    ProcessorRejected(String),
    #[error("A payment link is already being created for order {0}")]
    LinkCreationInProgress(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentStoreError> for PaymentLinkError {
    fn from(e: PaymentStoreError) -> Self {
        PaymentLinkError::DatabaseError(e.to_string())
    }
}

impl From<MerchantConfigError> for PaymentLinkError {
    fn from(e: MerchantConfigError) -> Self {
        PaymentLinkError::DatabaseError(e.to_string())
    }
}

impl From<ProcessorError> for PaymentLinkError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::Rejected(msg) => PaymentLinkError::ProcessorRejected(msg),
            ProcessorError::Unavailable(msg) | ProcessorError::InvalidResponse(msg) => {
                PaymentLinkError::ProcessorUnavailable(msg)
            },
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Invalid webhook signature")]
    SignatureInvalid,
    #[error("Malformed webhook payload. {0}")]
    MalformedPayload(String),
    #[error("No payment exists for LINK payment {0}")]
    PaymentNotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentStoreError> for ReconciliationError {
    fn from(e: PaymentStoreError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

impl From<WebhookLogError> for ReconciliationError {
    fn from(e: WebhookLogError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

impl From<MerchantConfigError> for ReconciliationError {
    fn from(e: MerchantConfigError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
