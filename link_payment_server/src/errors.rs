use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use link_payment_engine::{traits::SessionError, PaymentLinkError, ReconciliationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    PaymentLink(#[from] PaymentLinkError),
    #[error("{0}")]
    Reconciliation(#[from] ReconciliationError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentLink(e) => match e {
                PaymentLinkError::Validation(_) => StatusCode::BAD_REQUEST,
                PaymentLinkError::NotConfigured(_) => StatusCode::BAD_REQUEST,
                PaymentLinkError::ProcessorRejected(_) => StatusCode::BAD_REQUEST,
                PaymentLinkError::LinkCreationInProgress(_) => StatusCode::CONFLICT,
                PaymentLinkError::ProcessorUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PaymentLinkError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Reconciliation(e) => match e {
                ReconciliationError::SignatureInvalid => StatusCode::UNAUTHORIZED,
                ReconciliationError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                ReconciliationError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
                ReconciliationError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No session token was provided.")]
    MissingToken,
    #[error("Session token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Session token is invalid. {0}")]
    ValidationError(String),
    #[error("Session token has expired.")]
    Expired,
    #[error("Session token does not name a valid shop. {0}")]
    InvalidShop(String),
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        Self::BackendError(e.to_string())
    }
}
