use chrono::{DateTime, Utc};
use ledger_core::{AccountId, AppError, Currency, PaymentId, ReservationId, Result, TransactionId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Status of a `Payment` (§3 "Payment", invariant I-P2). Advances
/// monotonically: PENDING -> PROCESSING -> {COMPLETED, FAILED, CANCELLED};
/// PENDING can also go directly to CANCELLED. COMPLETED and CANCELLED are
/// terminal; FAILED is terminal except for administrative re-processing,
/// which is out of scope (§1 non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Cancelled | PaymentStatus::Failed
        )
    }
}

/// The saga subject (§4.6). Owned by the Payment Orchestrator; never
/// touched by the Ledger or the Transaction Record Store directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub reference_number: String,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub idempotency_key: String,
    pub status: PaymentStatus,
    pub reservation_id: Option<ReservationId>,
    pub transaction_id: Option<TransactionId>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// `CreatePayment` (§4.6). The idempotency key threaded through every
    /// outbound saga call (§9 "single source of a payment's idempotency
    /// keys") is minted once, here, and never regenerated per attempt.
    pub fn new(
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: i64,
        currency: Currency,
    ) -> Result<Self> {
        if source_account_id == destination_account_id {
            return Err(AppError::InvalidArgument(
                "source and destination account must differ".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "amount must be positive, got {amount}"
            )));
        }

        let now = Utc::now();
        let id = PaymentId::new();
        Ok(Self {
            id,
            reference_number: format!("PAY-{}", Uuid::new_v4().simple()),
            source_account_id,
            destination_account_id,
            amount,
            currency,
            idempotency_key: id.to_string(),
            status: PaymentStatus::Pending,
            reservation_id: None,
            transaction_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        })
    }

    pub fn can_process(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    /// Appends a best-effort compensation failure note to `failure_reason`
    /// (§4.6 "Compensation must be best-effort ... appended to
    /// `failure_reason` as '(WARNING: failed to roll back X)'").
    pub fn append_compensation_warning(&mut self, what: &str, err: &AppError) {
        let warning = format!("(WARNING: failed to roll back {what}: {err})");
        match &mut self.failure_reason {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(&warning);
            }
            None => self.failure_reason = Some(warning),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    #[test]
    fn rejects_same_account_transfer() {
        let a = AccountId::new();
        let result = Payment::new(a, a, 100, usd());
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let result = Payment::new(AccountId::new(), AccountId::new(), 0, usd());
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn new_payment_is_pending_with_its_own_idempotency_key() {
        let payment = Payment::new(AccountId::new(), AccountId::new(), 100, usd()).unwrap();
        assert!(payment.can_process());
        assert_eq!(payment.idempotency_key, payment.id.to_string());
    }

    #[test]
    fn cancel_allowed_from_pending_and_processing_only() {
        let mut payment = Payment::new(AccountId::new(), AccountId::new(), 100, usd()).unwrap();
        assert!(payment.can_cancel());
        payment.status = PaymentStatus::Processing;
        assert!(payment.can_cancel());
        payment.status = PaymentStatus::Completed;
        assert!(!payment.can_cancel());
    }

    #[test]
    fn compensation_warnings_accumulate_in_failure_reason() {
        let mut payment = Payment::new(AccountId::new(), AccountId::new(), 100, usd()).unwrap();
        payment.failure_reason = Some("insufficient funds".to_string());
        payment.append_compensation_warning(
            "reservation release",
            &AppError::Internal(anyhow::anyhow!("timeout")),
        );
        let reason = payment.failure_reason.unwrap();
        assert!(reason.starts_with("insufficient funds"));
        assert!(reason.contains("WARNING: failed to roll back reservation release"));
    }
}
