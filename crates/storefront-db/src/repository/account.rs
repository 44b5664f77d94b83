//! # Account Repository
//!
//! Balances of buyers and sellers.
//!
//! ## Fused Check-and-Mutate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compare in Rust, then write                            │
//! │     SELECT balance_cents ...      (both checkouts see $50)             │
//! │     UPDATE ... SET balance_cents = 20                                  │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional UPDATE                                     │
//! │     UPDATE accounts SET balance_cents = balance_cents - 30             │
//! │     WHERE user_id = ? AND balance_cents >= 30                          │
//! │                                                                         │
//! │  rows_affected = 0 → read the balance to build the error               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `debit` and `credit` run inside the caller's transaction and never commit.
//! The management operations (`open_account`, `deposit`, `withdraw`) each
//! wrap those primitives in their own short transaction.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use storefront_core::validation::{validate_deposit, validate_transfer_amount};
use storefront_core::{Account, CoreError, Money, MAX_ACCOUNT_BALANCE_CENTS};

/// Repository for account balances.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Gets an account by user ID.
    pub async fn get(&self, user_id: &str) -> DbResult<Option<Account>> {
        fetch_account(&self.pool, user_id).await
    }

    // =========================================================================
    // Transaction-scoped primitives
    // =========================================================================

    /// Creates an account inside `tx`.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` if the user already has an account
    /// - `CoreError::BalanceLimitExceeded` if `initial` is over the maximum
    pub async fn open(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        initial: Money,
        now: DateTime<Utc>,
    ) -> StoreResult<Account> {
        if initial.is_negative() {
            return Err(storefront_core::ValidationError::MustBePositive {
                field: "initial balance".to_string(),
            }
            .into());
        }
        let max = Money::from_cents(MAX_ACCOUNT_BALANCE_CENTS);
        if initial > max {
            return Err(CoreError::BalanceLimitExceeded { max }.into());
        }

        debug!(user_id = %user_id, balance = %initial, "Opening account");

        let account = Account {
            user_id: user_id.to_string(),
            balance_cents: initial.cents(),
            updated_at: now,
        };

        sqlx::query("INSERT INTO accounts (user_id, balance_cents, updated_at) VALUES (?1, ?2, ?3)")
            .bind(&account.user_id)
            .bind(account.balance_cents)
            .bind(account.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, user_id),
                other => other,
            })?;

        Ok(account)
    }

    /// Decreases the balance by `amount` inside `tx`.
    ///
    /// A missing account has a balance of zero.
    ///
    /// ## Errors
    /// `CoreError::InsufficientFunds` if the balance is below `amount`.
    pub async fn debit(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        debug!(user_id = %user_id, amount = %amount, "Debiting account");

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - ?2,
                updated_at = ?3
            WHERE user_id = ?1 AND balance_cents >= ?2
            "#,
        )
        .bind(user_id)
        .bind(amount.cents())
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let available = fetch_account(&mut **tx, user_id)
                .await?
                .map(|a| a.balance())
                .unwrap_or_default();

            if available >= amount {
                // Zero debit on an account that does not exist yet
                return Ok(());
            }

            return Err(CoreError::InsufficientFunds {
                user_id: user_id.to_string(),
                available,
                requested: amount,
            }
            .into());
        }

        Ok(())
    }

    /// Increases the balance by `amount` inside `tx`, creating the account
    /// on first credit. No upper bound is enforced here.
    pub async fn credit(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user_id = %user_id, amount = %amount, "Crediting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, balance_cents, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                balance_cents = balance_cents + excluded.balance_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(amount.cents())
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Account management
    // =========================================================================

    /// Opens an account with an initial balance.
    pub async fn open_account(&self, user_id: &str, initial: Money) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;
        let account = self.open(&mut tx, user_id, initial, Utc::now()).await?;
        tx.commit().await?;
        Ok(account)
    }

    /// Adds funds to an account.
    ///
    /// ## Errors
    /// - `ValidationError::MustBePositive` for a zero or negative amount
    /// - `CoreError::BalanceLimitExceeded` if the new balance would exceed
    ///   [`MAX_ACCOUNT_BALANCE_CENTS`]
    /// - `DbError::NotFound` if the account does not exist
    pub async fn deposit(&self, user_id: &str, amount: Money) -> StoreResult<Account> {
        validate_transfer_amount(amount)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?2,
                updated_at = ?3
            WHERE user_id = ?1 AND balance_cents + ?2 <= ?4
            "#,
        )
        .bind(user_id)
        .bind(amount.cents())
        .bind(now)
        .bind(MAX_ACCOUNT_BALANCE_CENTS)
        .execute(&mut *tx)
        .await?;

        let account = fetch_account(&mut *tx, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Account", user_id))?;

        if result.rows_affected() == 0 {
            // Reports BalanceLimitExceeded
            validate_deposit(account.balance(), amount)?;
        }

        tx.commit().await?;

        debug!(user_id = %user_id, balance = %account.balance(), "Deposit complete");
        Ok(account)
    }

    /// Removes funds from an account.
    ///
    /// ## Errors
    /// - `ValidationError::MustBePositive` for a zero or negative amount
    /// - `CoreError::InsufficientFunds` if the balance is too low
    pub async fn withdraw(&self, user_id: &str, amount: Money) -> StoreResult<Account> {
        validate_transfer_amount(amount)?;

        let mut tx = self.pool.begin().await?;
        self.debit(&mut tx, user_id, amount, Utc::now()).await?;
        let account = fetch_account(&mut *tx, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Account", user_id))?;
        tx.commit().await?;

        Ok(account)
    }
}

async fn fetch_account<'e, E>(executor: E, user_id: &str) -> DbResult<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let account = sqlx::query_as::<_, Account>(
        "SELECT user_id, balance_cents, updated_at FROM accounts WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}
