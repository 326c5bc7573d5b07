use ledger_core::{AccountId, AppError, ReservationId, Result};
use sqlx::{Postgres, Transaction};

use crate::models::Reservation;

/// Reservation Store (§4.2) access for the `reservations` table.
pub struct ReservationRepository;

impl ReservationRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: ReservationId,
    ) -> Result<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, account_id, amount, currency, status, idempotency_key,
                   transaction_id, release_reason, expires_at, created_at,
                   committed_at, released_at
            FROM reservations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {id} not found")))
    }

    /// Non-locking read of the owning `account_id`, used only to discover
    /// which account row to lock *before* `find_by_id` takes the
    /// reservation row lock (§5 "account row before reservation rows").
    /// Callers that need the lock must re-read the reservation with
    /// `find_by_id` after locking the account.
    pub async fn peek_account_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: ReservationId,
    ) -> Result<AccountId> {
        sqlx::query_as::<_, (AccountId,)>(
            r#"
            SELECT account_id
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .map(|(account_id,)| account_id)
        .ok_or_else(|| AppError::NotFound(format!("reservation {id} not found")))
    }

    /// Unique lookup by idempotency key (I-R1). Returns the row regardless
    /// of its status — the caller of `ReserveBalance` decides what a
    /// pre-existing row means (§4.3 idempotency note).
    pub async fn find_by_idempotency_key(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
    ) -> Result<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, account_id, amount, currency, status, idempotency_key,
                   transaction_id, release_reason, expires_at, created_at,
                   committed_at, released_at
            FROM reservations
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    /// Sum of PENDING reservation amounts for an account, read under the
    /// caller's transaction so it is consistent with the account row lock
    /// already held (§4.1 `reservations_pending_total`).
    pub async fn pending_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
    ) -> Result<i64> {
        let row: (Option<i64>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount)
            FROM reservations
            WHERE account_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0.unwrap_or(0))
    }

    /// Inserts a new PENDING reservation. The `idempotency_key` unique
    /// index (§6.5) turns a racing duplicate insert into a unique
    /// violation, mapped here to `AlreadyExists` (I-R1); the caller is
    /// expected to have already checked `find_by_idempotency_key` under the
    /// same transaction, so this only fires on a genuine race, not the
    /// ordinary idempotent-replay path.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, account_id, amount, currency, status, idempotency_key, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.account_id)
        .bind(reservation.amount)
        .bind(reservation.currency.as_str())
        .bind(reservation.status)
        .bind(&reservation.idempotency_key)
        .bind(reservation.expires_at)
        .bind(reservation.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::AlreadyExists(format!(
                    "idempotency key '{}' collided with a concurrent insert",
                    reservation.idempotency_key
                ))
            }
            _ => AppError::Database(e),
        })?;

        Ok(())
    }

    /// Persists a status transition (COMMITTED or RELEASED) and its
    /// terminal metadata (I-R5).
    pub async fn save(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2,
                transaction_id = $3,
                release_reason = $4,
                committed_at = $5,
                released_at = $6
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.status)
        .bind(reservation.transaction_id)
        .bind(&reservation.release_reason)
        .bind(reservation.committed_at)
        .bind(reservation.released_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}

impl Default for ReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}
