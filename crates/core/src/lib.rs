//! AutoClaim Core - Domain entities, services, and traits.
//!
//! This crate contains the assessment-to-report pipeline: payload
//! normalization, currency localization, the credit ledger contract, overlay
//! geometry and report pagination. It is database-agnostic and defines traits
//! that are implemented by the `storage-sqlite` crate.

pub mod assessment;
pub mod constants;
pub mod credits;
pub mod errors;
pub mod fx;
pub mod overlay;
pub mod report;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
