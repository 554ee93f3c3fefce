//! SQLite storage implementation for AutoClaim.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the ledger and repository traits defined in `autoclaim-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The credit ledger and saved report repositories
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The core crate is database-agnostic and works with traits.
//!
//! ```text
//!      core (domain)
//!            │
//!            ▼
//!  storage-sqlite (this crate)
//!            │
//!            ▼
//!        SQLite DB
//! ```

pub mod credits;
pub mod db;
pub mod errors;
pub mod reports;
pub mod schema;

pub use credits::CreditRepository;
pub use reports::ReportRepository;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from autoclaim-core for convenience
pub use autoclaim_core::errors::{DatabaseError, Error, Result};
