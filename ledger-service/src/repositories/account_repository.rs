use ledger_core::{AccountId, AppError, Result};
use sqlx::{Postgres, Transaction};

use crate::models::Account;

/// Balance Store (§4.1) access for the `accounts` table. Every method here
/// is designed to be called inside a transaction the caller already holds,
/// so that the account row lock (§5 "account row before reservation rows")
/// spans the whole `ReserveBalance`/`CommitReservation`/`CreditBalance` body.
pub struct AccountRepository;

impl AccountRepository {
    pub fn new() -> Self {
        Self
    }

    /// Loads and locks the account row (`SELECT ... FOR UPDATE`) for the
    /// duration of the caller's transaction. This is the lock that makes
    /// the check-then-insert in `ReserveBalance` atomic (§5 isolation
    /// requirement, open question #1 in §9 of the original spec).
    pub async fn load_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: AccountId,
    ) -> Result<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, currency, balance, active, created_at, updated_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))
    }

    /// Read-only load, used by `GetBalance` which does not mutate state and
    /// therefore does not need row locking.
    pub async fn load(&self, tx: &mut Transaction<'_, Postgres>, id: AccountId) -> Result<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, currency, balance, active, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))
    }

    /// Persists a mutated balance. Only `balance` and `updated_at` ever
    /// change after creation (currency and active are set elsewhere, out of
    /// this spec's scope — see §1 "customer registry").
    pub async fn save(&self, tx: &mut Transaction<'_, Postgres>, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(account.balance)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}

impl Default for AccountRepository {
    fn default() -> Self {
        Self::new()
    }
}
