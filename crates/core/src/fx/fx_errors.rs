use thiserror::Error;

/// Errors raised while localizing money amounts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FxError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// A caller handed the converter an amount it must never see
    /// (negative, non-finite, or too large to scale). Not user facing.
    #[error("Conversion contract violated: {0}")]
    ConversionContractViolation(String),

    #[error("Invalid exchange rate: {0}")]
    InvalidExchangeRate(String),
}
