//! FX module - presentation currencies and base-currency conversion.

mod currency;
mod currency_converter;
mod fx_errors;

pub use currency::{CurrencyCode, CurrencySpec, CurrencyTable, RoundingRule};
pub use currency_converter::{format_amount, CurrencyConverter};
pub use fx_errors::FxError;
