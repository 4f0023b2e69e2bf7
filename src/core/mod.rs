//! Core types shared by every stage of a run.
//!
//! The invoice model mirrors the subset of UBL-TR the reports need:
//! one header per document plus its lines, with amounts held as
//! [`rust_decimal::Decimal`].

mod config;
mod currencies;
mod error;
mod types;

pub use config::*;
pub use currencies::{is_known_currency_code, resolve_currency};
pub use error::*;
pub use types::*;
