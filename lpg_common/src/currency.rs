use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// Stablecoins that LINK will settle on the XRP Ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Currency {
    Rlusd,
    Usdc,
}

pub const SUPPORTED_CURRENCIES: [Currency; 2] = [Currency::Rlusd, Currency::Usdc];

#[derive(Debug, Clone, Error)]
#[error("{0} is not a supported currency")]
pub struct CurrencyError(pub String);

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Rlusd => "RLUSD",
            Currency::Usdc => "USDC",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RLUSD" => Ok(Self::Rlusd),
            "USDC" => Ok(Self::Usdc),
            _ => Err(CurrencyError(s.to_string())),
        }
    }
}
