use ledger_core::{AppError, PaymentId, Result, TransactionId};
use sqlx::PgPool;

use crate::models::Transaction;

/// `transactions` table access (§6.5, §4.4). `CreateTransaction` is
/// idempotent on `payment_id` (§9 "reuses the payment's own key"), so
/// `insert_idempotent` is a find-then-insert rather than a raw insert.
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: TransactionId) -> Result<Transaction> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, reference_number, source_account_id, destination_account_id,
                   amount, currency, status, payment_id, reservation_id,
                   failure_reason, created_at, completed_at, updated_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))
    }

    pub async fn find_by_payment_id(&self, payment_id: PaymentId) -> Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, reference_number, source_account_id, destination_account_id,
                   amount, currency, status, payment_id, reservation_id,
                   failure_reason, created_at, completed_at, updated_at
            FROM transactions
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn insert(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, reference_number, source_account_id, destination_account_id,
                 amount, currency, status, payment_id, reservation_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.reference_number)
        .bind(transaction.source_account_id)
        .bind(transaction.destination_account_id)
        .bind(transaction.amount)
        .bind(transaction.currency.as_str())
        .bind(transaction.status)
        .bind(transaction.payment_id)
        .bind(transaction.reservation_id)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn save(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2,
                failure_reason = $3,
                completed_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.status)
        .bind(&transaction.failure_reason)
        .bind(transaction.completed_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
