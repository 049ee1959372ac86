use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The LINK API could not be reached: {0}")]
    Unavailable(String),
    #[error("The LINK API rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid response from the LINK API: {0}")]
    InvalidResponse(String),
}
