//! The reservation engine (§4.3 "Ledger RPC Server (the reservation
//! engine)"). Each public method here is one `LedgerService` operation; the
//! axum handlers in `api::handlers` do nothing but unwrap/wrap these calls.
//!
//! Every operation opens exactly one `sqlx` transaction and commits before
//! returning (§9 "Transaction boundary"). Within a transaction the account
//! row is always locked before any reservation row it touches (§5 "Locking
//! discipline"); where an operation is keyed by `reservation_id` and must
//! discover the owning account first, it peeks the account id with a
//! non-locking read, then re-acquires both rows in account-first order.

use chrono::Utc;
use ledger_core::dto::{
    CommitReservationRequest, CreditBalanceRequest, CreditBalanceResponse, GetBalanceResponse,
    ReleaseReservationRequest, ReserveBalanceRequest, ReserveBalanceResponse,
};
use ledger_core::{AccountId, AppError, Currency, Result};
use sqlx::PgPool;

use crate::cache::BalanceCache;
use crate::models::{Reservation, ReservationStatus};
use crate::repositories::{AccountRepository, ReservationRepository};

pub struct LedgerEngine {
    pool: PgPool,
    accounts: AccountRepository,
    reservations: ReservationRepository,
    cache: Option<BalanceCache>,
    default_ttl: chrono::Duration,
}

impl LedgerEngine {
    pub fn new(pool: PgPool, cache: Option<BalanceCache>, default_ttl: chrono::Duration) -> Self {
        Self {
            pool,
            accounts: AccountRepository::new(),
            reservations: ReservationRepository::new(),
            cache,
            default_ttl,
        }
    }

    /// `GetBalance` (§4.3) — available balance = balance - Σ pending
    /// reservations (§3 "derived quantity"), never materialized.
    pub async fn get_balance(&self, account_id: AccountId) -> Result<GetBalanceResponse> {
        if let Some(cache) = &self.cache {
            if let Some((available, currency)) = cache.get(account_id).await {
                return Ok(GetBalanceResponse {
                    available,
                    currency: Currency::new(currency)?,
                });
            }
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let account = self.accounts.load(&mut tx, account_id).await?;
        let pending = self.reservations.pending_total(&mut tx, account_id).await?;
        tx.commit().await.map_err(AppError::Database)?;

        let available = account.balance - pending;
        if let Some(cache) = &self.cache {
            cache.set(account_id, available, account.currency.as_str()).await;
        }

        Ok(GetBalanceResponse {
            available,
            currency: account.currency,
        })
    }

    /// `ReserveBalance` (§4.3). The idempotency-key lookup happens before
    /// any account-specific precondition is checked: a pre-existing
    /// reservation for the key is returned as-is regardless of whether the
    /// *new* request's amount/currency/account would themselves be valid
    /// (§9 open question #3, scenario 5 — L-IDEM).
    pub async fn reserve_balance(
        &self,
        req: ReserveBalanceRequest,
    ) -> Result<ReserveBalanceResponse> {
        if req.idempotency_key.trim().is_empty() {
            return Err(AppError::InvalidArgument("idempotency_key must not be empty".into()));
        }
        if req.amount <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "amount must be positive, got {}",
                req.amount
            )));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        if let Some(existing) = self
            .reservations
            .find_by_idempotency_key(&mut tx, &req.idempotency_key)
            .await?
        {
            tx.commit().await.map_err(AppError::Database)?;
            return Ok(ReserveBalanceResponse {
                reservation_id: existing.id,
            });
        }

        let account = self.accounts.load_for_update(&mut tx, req.account_id).await?;
        if !account.is_usable() {
            return Err(AppError::FailedPrecondition(format!(
                "account {} is inactive",
                req.account_id
            )));
        }
        if account.currency != req.currency {
            return Err(AppError::InvalidArgument(format!(
                "currency mismatch: account is {}, request is {}",
                account.currency, req.currency
            )));
        }

        let pending = self.reservations.pending_total(&mut tx, req.account_id).await?;
        let available = account.balance - pending;
        if available < req.amount {
            crate::observability::get_metrics().record_insufficient_funds();
            return Err(AppError::FailedPrecondition(format!(
                "insufficient funds: available {available}, requested {}",
                req.amount
            )));
        }

        let reservation = Reservation::new_pending(
            req.account_id,
            req.amount,
            req.currency,
            req.idempotency_key,
            self.default_ttl,
        );
        self.reservations.insert(&mut tx, &reservation).await?;
        tx.commit().await.map_err(AppError::Database)?;

        if let Some(cache) = &self.cache {
            cache.invalidate(req.account_id).await;
        }
        crate::observability::get_metrics().record_reservation_created();

        Ok(ReserveBalanceResponse {
            reservation_id: reservation.id,
        })
    }

    /// `CommitReservation` (§4.3). The account is re-read and re-locked
    /// fresh (not assumed from the reservation row) so the balance
    /// subtraction is computed under the current lock, not a stale value.
    pub async fn commit_reservation(&self, req: CommitReservationRequest) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let account_id = self
            .reservations
            .peek_account_id(&mut tx, req.reservation_id)
            .await?;

        let mut account = self.accounts.load_for_update(&mut tx, account_id).await?;
        let mut reservation = self.reservations.find_by_id(&mut tx, req.reservation_id).await?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::FailedPrecondition(format!(
                "reservation {} is not PENDING (status: {:?})",
                reservation.id, reservation.status
            )));
        }

        let new_balance = account.balance - reservation.amount;
        if new_balance < 0 {
            // Defensive guard only: I-R1 + reservation accounting rule out
            // this branch in practice (§4.3 "must not happen").
            return Err(AppError::FailedPrecondition(format!(
                "commit would drive account {} balance negative",
                account.id
            )));
        }

        account.balance = new_balance;
        self.accounts.save(&mut tx, &account).await?;

        reservation.status = ReservationStatus::Committed;
        reservation.committed_at = Some(Utc::now());
        reservation.transaction_id = Some(req.transaction_id);
        self.reservations.save(&mut tx, &reservation).await?;

        tx.commit().await.map_err(AppError::Database)?;

        if let Some(cache) = &self.cache {
            cache.invalidate(account_id).await;
        }
        crate::observability::get_metrics().record_reservation_committed();

        Ok(())
    }

    /// `ReleaseReservation` (§4.3). No balance movement — the hold was only
    /// ever withheld from *available*, never actually debited.
    pub async fn release_reservation(&self, req: ReleaseReservationRequest) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut reservation = self.reservations.find_by_id(&mut tx, req.reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::FailedPrecondition(format!(
                "reservation {} is not PENDING (status: {:?})",
                reservation.id, reservation.status
            )));
        }

        reservation.status = ReservationStatus::Released;
        reservation.released_at = Some(Utc::now());
        reservation.release_reason = Some(req.reason.clone());
        self.reservations.save(&mut tx, &reservation).await?;

        tx.commit().await.map_err(AppError::Database)?;

        if let Some(cache) = &self.cache {
            cache.invalidate(reservation.account_id).await;
        }
        crate::observability::get_metrics().record_reservation_released(&req.reason);

        Ok(())
    }

    /// `CreditBalance` (§4.3). Deliberately **not** idempotent on
    /// `reference_id` — a retried credit double-credits. Preserved as
    /// specified (§9 open question #2); callers (the Payment Orchestrator)
    /// must not retry a credit whose outcome is unknown without separately
    /// reconciling against the transaction it was for.
    pub async fn credit_balance(&self, req: CreditBalanceRequest) -> Result<CreditBalanceResponse> {
        if req.amount <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "amount must be positive, got {}",
                req.amount
            )));
        }
        if req.reference_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("reference_id must not be empty".into()));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut account = self.accounts.load_for_update(&mut tx, req.account_id).await?;
        if !account.is_usable() {
            return Err(AppError::FailedPrecondition(format!(
                "account {} is inactive",
                req.account_id
            )));
        }
        if account.currency != req.currency {
            return Err(AppError::InvalidArgument(format!(
                "currency mismatch: account is {}, request is {}",
                account.currency, req.currency
            )));
        }

        account.balance += req.amount;
        self.accounts.save(&mut tx, &account).await?;
        tx.commit().await.map_err(AppError::Database)?;

        if let Some(cache) = &self.cache {
            cache.invalidate(req.account_id).await;
        }

        Ok(CreditBalanceResponse {
            new_balance: account.balance,
        })
    }
}

#[cfg(test)]
mod tests {
    /// Pure arithmetic for the derived "available balance" quantity
    /// (§3, INV-2), exercised without a database.
    fn available(balance: i64, pending_total: i64) -> i64 {
        balance - pending_total
    }

    #[test]
    fn available_balance_subtracts_pending_reservations() {
        assert_eq!(available(1000, 0), 1000);
        assert_eq!(available(1000, 250), 750);
    }

    #[test]
    fn available_equal_to_amount_allows_exact_reservation() {
        let balance = 500;
        let pending = 0;
        let amount = 500;
        assert!(available(balance, pending) >= amount);
    }

    #[test]
    fn available_one_short_rejects_reservation() {
        let balance = 499;
        let pending = 0;
        let amount = 500;
        assert!(available(balance, pending) < amount);
    }
}
