use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

use super::credits_model::{CreditAccount, CreditReservation, NewCreditAccount};
use super::credits_traits::CreditLedgerTrait;
use crate::constants::DEFAULT_STARTING_CREDITS;
use crate::errors::{DatabaseError, Error, Result};

/// Ledger for single-process deployments.
///
/// One mutex guards the whole account map; every balance check and the
/// matching update happen under the same lock acquisition.
pub struct InMemoryCreditLedger {
    accounts: Mutex<HashMap<String, CreditAccount>>,
    starting_credits: i64,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::with_starting_credits(DEFAULT_STARTING_CREDITS)
    }

    pub fn with_starting_credits(starting_credits: i64) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            starting_credits,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CreditAccount>>> {
        self.accounts
            .lock()
            .map_err(|_| Error::Unexpected("Credit ledger lock poisoned".to_string()))
    }

    fn not_found(account_id: &str) -> Error {
        Error::Database(DatabaseError::NotFound(format!(
            "Credit account {} not found",
            account_id
        )))
    }
}

impl Default for InMemoryCreditLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CreditLedgerTrait for InMemoryCreditLedger {
    async fn reserve(&self, account_id: &str) -> Result<CreditReservation> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| Self::not_found(account_id))?;
        if account.credits <= 0 {
            debug!("Reservation refused for {}: no credits left", account_id);
            return Err(Error::InsufficientCredits {
                account_id: account_id.to_string(),
            });
        }
        account.credits -= 1;
        account.updated_at = Utc::now();
        Ok(CreditReservation {
            account_id: account_id.to_string(),
            remaining: account.credits,
        })
    }

    async fn refund(&self, account_id: &str) -> Result<i64> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| Self::not_found(account_id))?;
        account.credits += 1;
        account.updated_at = Utc::now();
        Ok(account.credits)
    }

    async fn create_account(&self, new_account: NewCreditAccount) -> Result<CreditAccount> {
        new_account.validate()?;
        let id = new_account
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut accounts = self.lock()?;
        if accounts.contains_key(&id) {
            return Err(Error::Database(DatabaseError::UniqueViolation(format!(
                "Credit account {} already exists",
                id
            ))));
        }
        let now = Utc::now();
        let account = CreditAccount {
            id: id.clone(),
            credits: new_account.starting_credits.unwrap_or(self.starting_credits),
            onboarding_complete: false,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(id, account.clone());
        info!(
            "Created credit account {} with {} credit(s)",
            account.id, account.credits
        );
        Ok(account)
    }

    async fn complete_onboarding(&self, account_id: &str) -> Result<CreditAccount> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| Self::not_found(account_id))?;
        account.onboarding_complete = true;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    fn get_account(&self, account_id: &str) -> Result<CreditAccount> {
        self.lock()?
            .get(account_id)
            .cloned()
            .ok_or_else(|| Self::not_found(account_id))
    }
}
