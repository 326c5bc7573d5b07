use ledger_core::{AppError, PaymentId, Result};
use sqlx::PgPool;

use crate::models::Payment;

/// `payments` table access (§6.5). Unlike the Ledger's repositories, the
/// saga does not hold a single transaction across its whole run — each
/// external call (Ledger RPC, event publish) is its own round trip — so
/// `save` here is a plain autocommit `UPDATE`, one per saga step.
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: PaymentId) -> Result<Payment> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, reference_number, source_account_id, destination_account_id,
                   amount, currency, idempotency_key, status, reservation_id,
                   transaction_id, failure_reason, created_at, updated_at, processed_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))
    }

    pub async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, reference_number, source_account_id, destination_account_id,
                 amount, currency, idempotency_key, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id)
        .bind(&payment.reference_number)
        .bind(payment.source_account_id)
        .bind(payment.destination_account_id)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(&payment.idempotency_key)
        .bind(payment.status)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Persists the full row, including whichever fields the current saga
    /// step just set (`reservation_id`, `transaction_id`, `status`,
    /// `failure_reason`, `processed_at`). Called once per saga step rather
    /// than batched, so a crash mid-saga leaves an observable partial state
    /// (§4.6, §7 "partial commit anomaly").
    pub async fn save(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                reservation_id = $3,
                transaction_id = $4,
                failure_reason = $5,
                updated_at = NOW(),
                processed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(payment.status)
        .bind(payment.reservation_id)
        .bind(payment.transaction_id)
        .bind(&payment.failure_reason)
        .bind(payment.processed_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
