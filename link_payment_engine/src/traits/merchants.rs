use thiserror::Error;

use crate::db_types::{MerchantConfig, MerchantConfigValidationError, NewMerchantConfig};

#[derive(Debug, Clone, Error)]
pub enum MerchantConfigError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid merchant configuration. {0}")]
    Invalid(#[from] MerchantConfigValidationError),
}

impl From<sqlx::Error> for MerchantConfigError {
    fn from(e: sqlx::Error) -> Self {
        MerchantConfigError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait MerchantManagement {
    async fn fetch_merchant_config(&self, shop: &str) -> Result<Option<MerchantConfig>, MerchantConfigError>;

    /// Validates and stores the configuration for a shop, replacing any previous one.
    async fn upsert_merchant_config(&self, config: NewMerchantConfig) -> Result<MerchantConfig, MerchantConfigError>;
}
