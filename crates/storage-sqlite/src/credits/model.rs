//! Database model for credit accounts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use autoclaim_core::credits::CreditAccount;

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::credit_accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CreditAccountDB {
    pub id: String,
    pub credits: i64,
    pub onboarding_complete: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CreditAccountDB {
    pub fn new(id: String, credits: i64) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            credits,
            onboarding_complete: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<CreditAccountDB> for CreditAccount {
    fn from(db: CreditAccountDB) -> Self {
        Self {
            id: db.id,
            credits: db.credits,
            onboarding_complete: db.onboarding_complete,
            created_at: db.created_at.and_utc(),
            updated_at: db.updated_at.and_utc(),
        }
    }
}
