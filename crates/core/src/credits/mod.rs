//! Credit ledger - per-account balances gating each analysis.

mod credits_model;
mod credits_traits;
mod in_memory_ledger;

pub use credits_model::{CreditAccount, CreditReservation, NewCreditAccount};
pub use credits_traits::CreditLedgerTrait;
pub use in_memory_ledger::InMemoryCreditLedger;
