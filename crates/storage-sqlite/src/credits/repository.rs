use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::{debug, info};
use std::sync::Arc;

use autoclaim_core::constants::DEFAULT_STARTING_CREDITS;
use autoclaim_core::credits::{
    CreditAccount, CreditLedgerTrait, CreditReservation, NewCreditAccount,
};
use autoclaim_core::errors::{DatabaseError, Error, Result};

use super::model::CreditAccountDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::credit_accounts;
use crate::schema::credit_accounts::dsl::*;

/// Credit ledger backed by the `credit_accounts` table.
///
/// Balance changes go through the writer actor as single conditional
/// updates, so concurrent reservations serialize on the database.
pub struct CreditRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
    starting_credits: i64,
}

impl CreditRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self {
            pool,
            writer,
            starting_credits: DEFAULT_STARTING_CREDITS,
        }
    }

    pub fn with_starting_credits(mut self, credits_per_account: i64) -> Self {
        self.starting_credits = credits_per_account;
        self
    }
}

fn not_found(account_id: &str) -> Error {
    Error::Database(DatabaseError::NotFound(format!(
        "Credit account {} not found",
        account_id
    )))
}

fn load_account(conn: &mut SqliteConnection, account_id: &str) -> Result<CreditAccountDB> {
    credit_accounts
        .select(CreditAccountDB::as_select())
        .find(account_id)
        .first::<CreditAccountDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| not_found(account_id))
}

#[async_trait]
impl CreditLedgerTrait for CreditRepository {
    async fn reserve(&self, account_id: &str) -> Result<CreditReservation> {
        let account_id = account_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(
                    credit_accounts
                        .filter(id.eq(&account_id))
                        .filter(credits.gt(0)),
                )
                .set((
                    credits.eq(credits - 1),
                    updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .execute(conn)
                .into_core()?;

                let account = load_account(conn, &account_id)?;
                if updated == 0 {
                    debug!("Reservation refused for {}: no credits left", account_id);
                    return Err(Error::InsufficientCredits { account_id });
                }

                Ok(CreditReservation {
                    account_id,
                    remaining: account.credits,
                })
            })
            .await
    }

    async fn refund(&self, account_id: &str) -> Result<i64> {
        let account_id = account_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(credit_accounts.find(&account_id))
                    .set((
                        credits.eq(credits + 1),
                        updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                if updated == 0 {
                    return Err(not_found(&account_id));
                }
                Ok(load_account(conn, &account_id)?.credits)
            })
            .await
    }

    async fn create_account(&self, new_account: NewCreditAccount) -> Result<CreditAccount> {
        new_account.validate()?;

        let account_db = CreditAccountDB::new(
            new_account
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            new_account.starting_credits.unwrap_or(self.starting_credits),
        );

        self.writer
            .exec(move |conn| {
                diesel::insert_into(credit_accounts::table)
                    .values(&account_db)
                    .execute(conn)
                    .into_core()?;
                info!(
                    "Created credit account {} with {} credits",
                    account_db.id, account_db.credits
                );
                Ok(account_db.into())
            })
            .await
    }

    async fn complete_onboarding(&self, account_id: &str) -> Result<CreditAccount> {
        let account_id = account_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(credit_accounts.find(&account_id))
                    .set((
                        onboarding_complete.eq(true),
                        updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                if updated == 0 {
                    return Err(not_found(&account_id));
                }
                Ok(load_account(conn, &account_id)?.into())
            })
            .await
    }

    fn get_account(&self, account_id: &str) -> Result<CreditAccount> {
        let mut conn = get_connection(&self.pool)?;
        Ok(load_account(&mut conn, account_id)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use tempfile::tempdir;

    async fn create_test_repository() -> (CreditRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (CreditRepository::new(Arc::clone(&pool), writer), temp_dir)
    }

    #[tokio::test]
    async fn test_create_account_uses_default_balance() {
        let (repo, _dir) = create_test_repository().await;
        let account = repo
            .create_account(NewCreditAccount::with_id("acc-1"))
            .await
            .unwrap();

        assert_eq!(account.id, "acc-1");
        assert_eq!(account.credits, DEFAULT_STARTING_CREDITS);
        assert!(!account.onboarding_complete);
        let stored = repo.get_account("acc-1").unwrap();
        assert_eq!(stored.id, account.id);
        assert_eq!(stored.credits, account.credits);
    }

    #[tokio::test]
    async fn test_create_account_generates_id() {
        let (repo, _dir) = create_test_repository().await;
        let account = repo
            .create_account(NewCreditAccount::default().starting_credits(2))
            .await
            .unwrap();
        assert!(!account.id.is_empty());
        assert_eq!(account.credits, 2);
    }

    #[tokio::test]
    async fn test_duplicate_account_is_unique_violation() {
        let (repo, _dir) = create_test_repository().await;
        repo.create_account(NewCreditAccount::with_id("acc-1"))
            .await
            .unwrap();
        let err = repo
            .create_account(NewCreditAccount::with_id("acc-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_reserve_and_refund() {
        let (repo, _dir) = create_test_repository().await;
        repo.create_account(NewCreditAccount::with_id("acc-1").starting_credits(2))
            .await
            .unwrap();

        let reservation = repo.reserve("acc-1").await.unwrap();
        assert_eq!(reservation.remaining, 1);
        assert_eq!(repo.refund("acc-1").await.unwrap(), 2);
        assert_eq!(repo.get_account("acc-1").unwrap().credits, 2);
    }

    #[tokio::test]
    async fn test_reserve_with_zero_balance_is_refused() {
        let (repo, _dir) = create_test_repository().await;
        repo.create_account(NewCreditAccount::with_id("acc-1").starting_credits(0))
            .await
            .unwrap();

        let err = repo.reserve("acc-1").await.unwrap_err();
        assert!(err.is_insufficient_credits());
        assert_eq!(repo.get_account("acc-1").unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let (repo, _dir) = create_test_repository().await;
        assert!(matches!(
            repo.reserve("missing").await.unwrap_err(),
            Error::Database(DatabaseError::NotFound(_))
        ));
        assert!(matches!(
            repo.refund("missing").await.unwrap_err(),
            Error::Database(DatabaseError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_account("missing").unwrap_err(),
            Error::Database(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_onboarding() {
        let (repo, _dir) = create_test_repository().await;
        repo.create_account(NewCreditAccount::with_id("acc-1"))
            .await
            .unwrap();
        let account = repo.complete_onboarding("acc-1").await.unwrap();
        assert!(account.onboarding_complete);
        assert_eq!(account.credits, DEFAULT_STARTING_CREDITS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_on_last_credit() {
        let (repo, _dir) = create_test_repository().await;
        repo.create_account(NewCreditAccount::with_id("acc-1").starting_credits(1))
            .await
            .unwrap();
        let repo = Arc::new(repo);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.reserve("acc-1").await })
            })
            .collect();

        let mut granted = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => granted += 1,
                Err(e) if e.is_insufficient_credits() => refused += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(refused, 7);
        assert_eq!(repo.get_account("acc-1").unwrap().credits, 0);
    }
}
