//! SQLite storage for the credit ledger.

mod model;
mod repository;

pub use model::CreditAccountDB;
pub use repository::CreditRepository;
