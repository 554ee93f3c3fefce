use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::{Error, Result};

/// Credit balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccount {
    pub id: String,
    pub credits: i64,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    pub fn has_credits(&self) -> bool {
        self.credits > 0
    }
}

/// Input model for registering an account with the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCreditAccount {
    /// Caller supplied id. A UUID is generated when absent.
    pub id: Option<String>,
    /// Starting balance. The ledger default applies when absent.
    pub starting_credits: Option<i64>,
}

impl NewCreditAccount {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            starting_credits: None,
        }
    }

    pub fn starting_credits(mut self, credits: i64) -> Self {
        self.starting_credits = Some(credits);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(Error::Validation(ValidationError::InvalidInput(
                    "Account id cannot be empty".to_string(),
                )));
            }
        }
        if let Some(credits) = self.starting_credits {
            if credits < 0 {
                return Err(Error::Validation(ValidationError::InvalidInput(format!(
                    "Starting credits cannot be negative, got {}",
                    credits
                ))));
            }
        }
        Ok(())
    }
}

/// Proof that one credit was consumed for an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditReservation {
    pub account_id: String,
    /// Balance left after the reservation.
    pub remaining: i64,
}
