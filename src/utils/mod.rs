pub mod error;
pub mod price;

pub use error::{AppError, Result};
pub use price::{find_currency_amount, parse_price_text};
