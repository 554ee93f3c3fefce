//! Core error types for the AutoClaim assessment pipeline.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::assessment::AssessmentError;
use crate::fx::FxError;
use crate::report::RenderError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when an analysis could not produce a usable result.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed, please try again.";

/// Message shown when the ledger refused a reservation.
pub const NO_CREDITS_MESSAGE: &str = "No credits remaining. Please contact support to top up.";

/// Message shown when an export could not be produced.
pub const EXPORT_FAILED_MESSAGE: &str = "Export failed, please retry export.";

/// Root error type for the assessment pipeline.
///
/// Database-specific errors are wrapped in string form to keep this type
/// database-agnostic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Assessment rejected: {0}")]
    Assessment(#[from] AssessmentError),

    #[error("Account {account_id} has no credits remaining")]
    InsufficientCredits { account_id: String },

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("Report rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Damage analysis provider failed: {0}")]
    AnalysisProvider(String),

    #[error("Operation cancelled by caller")]
    Cancelled,

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Message suitable for showing to the end user.
    ///
    /// Programming errors (fx contract violations, unexpected states) never
    /// leak their details; they collapse into the generic failure message.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Assessment(_) | Error::AnalysisProvider(_) | Error::Cancelled => {
                ANALYSIS_FAILED_MESSAGE
            }
            Error::InsufficientCredits { .. } => NO_CREDITS_MESSAGE,
            Error::Render(_) => EXPORT_FAILED_MESSAGE,
            _ => "Something went wrong, please try again.",
        }
    }

    /// Returns true when the ledger refused the reservation.
    pub fn is_insufficient_credits(&self) -> bool {
        matches!(self, Error::InsufficientCredits { .. })
    }
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_schema_violation() {
        let err: Error = AssessmentError::schema("damages[0].type", "unknown label 'Rust'").into();
        assert_eq!(err.user_message(), ANALYSIS_FAILED_MESSAGE);
    }

    #[test]
    fn test_user_message_for_insufficient_credits() {
        let err = Error::InsufficientCredits {
            account_id: "acc-1".to_string(),
        };
        assert!(err.is_insufficient_credits());
        assert_eq!(err.user_message(), NO_CREDITS_MESSAGE);
    }

    #[test]
    fn test_fx_contract_violation_is_not_user_facing() {
        let err: Error = FxError::ConversionContractViolation("amount is negative".into()).into();
        assert!(!err.user_message().contains("negative"));
    }

    #[test]
    fn test_render_failure_message() {
        let err: Error = RenderError::UnreadableSnapshot("bad signature".into()).into();
        assert_eq!(err.user_message(), EXPORT_FAILED_MESSAGE);
    }
}
