use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{de, de::Visitor, Deserialize, Deserializer, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A currency amount, stored and transmitted as a decimal string (e.g. "49.99").
///
/// The string form is kept verbatim so that the value sent to the payment processor, stored in the database and shown
/// on the commerce order is always identical. Construction guarantees that it parses as a decimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Amount(String);

#[derive(Debug, Clone, Error)]
#[error("Invalid amount: {0}")]
pub struct AmountError(pub String);

impl Amount {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_decimal(&self) -> Decimal {
        // Construction guarantees a valid decimal
        Decimal::from_str(&self.0).unwrap_or_default()
    }

    pub fn is_positive(&self) -> bool {
        self.as_decimal() > Decimal::ZERO
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError("amount is empty".into()));
        }
        Decimal::from_str(s).map_err(|e| AmountError(format!("{s} is not a decimal number. {e}")))?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value.normalize().to_string())
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Checkout widgets send amounts either as JSON strings or as numbers.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a decimal amount as a string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(|e: AmountError| E::custom(e.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Amount::from(Decimal::from(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Amount::from(Decimal::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Decimal::from_str(&v.to_string()).map(Amount::from).map_err(|e| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_amounts() {
        let a = "49.99".parse::<Amount>().unwrap();
        assert_eq!(a.as_str(), "49.99");
        assert!(a.is_positive());
        assert!(" 0 ".parse::<Amount>().map(|a| !a.is_positive()).unwrap());
        assert!("-3.5".parse::<Amount>().map(|a| !a.is_positive()).unwrap());
        assert!("".parse::<Amount>().is_err());
        assert!("ten".parse::<Amount>().is_err());
    }

    #[test]
    fn deserialize_strings_and_numbers() {
        let a: Amount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(a.as_str(), "12.50");
        let a: Amount = serde_json::from_str("12.5").unwrap();
        assert_eq!(a.as_str(), "12.5");
        let a: Amount = serde_json::from_str("100").unwrap();
        assert_eq!(a.as_str(), "100");
        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"100\"");
    }
}
