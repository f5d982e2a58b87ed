//! Database models.

pub mod category;
pub mod quote;
pub mod quotee;

pub use category::Category;
pub use quote::{CreateQuote, Quote};
pub use quotee::Quotee;
