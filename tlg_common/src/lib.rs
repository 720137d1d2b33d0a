mod currency;
mod helpers;
mod secret;

pub mod op;

pub use currency::{Currency, CurrencyError, DEFAULT_CURRENCY_CODE};
pub use helpers::{parse_boolean_flag, parse_env_value};
pub use secret::Secret;
