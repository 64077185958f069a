mod kobo;

pub mod op;
mod secret;

mod helpers;

pub use helpers::parse_boolean_flag;
pub use kobo::{Kobo, KoboConversionError, NAIRA_CURRENCY_CODE, NAIRA_CURRENCY_CODE_LOWER};
pub use secret::Secret;
