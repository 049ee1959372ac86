mod amount;
mod currency;
mod helpers;
mod payment_status;
mod secret;

pub use amount::{Amount, AmountError};
pub use currency::{Currency, CurrencyError, SUPPORTED_CURRENCIES};
pub use helpers::parse_boolean_flag;
pub use payment_status::{PaymentStatus, PaymentStatusError};
pub use secret::Secret;
