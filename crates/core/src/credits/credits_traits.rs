//! Credit ledger contract.

use async_trait::async_trait;

use super::credits_model::{CreditAccount, CreditReservation, NewCreditAccount};
use crate::errors::Result;

/// Atomic per-account credit balance.
///
/// `reserve` is a single compare-and-decrement: when two reservations race on
/// an account holding one credit, exactly one succeeds. Implementations must
/// never let a balance go below zero.
#[async_trait]
pub trait CreditLedgerTrait: Send + Sync {
    /// Consumes one credit.
    ///
    /// Fails with `Error::InsufficientCredits` and leaves the balance
    /// untouched when the account has none left.
    async fn reserve(&self, account_id: &str) -> Result<CreditReservation>;

    /// Returns one previously reserved credit. Returns the new balance.
    async fn refund(&self, account_id: &str) -> Result<i64>;

    /// Registers an account with its starting balance.
    async fn create_account(&self, new_account: NewCreditAccount) -> Result<CreditAccount>;

    /// Marks the onboarding flow as finished for an account.
    async fn complete_onboarding(&self, account_id: &str) -> Result<CreditAccount>;

    fn get_account(&self, account_id: &str) -> Result<CreditAccount>;
}
