use chrono::{DateTime, Utc};
use ledger_core::{AccountId, Currency, PaymentId, ReservationId, TransactionId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of a `Transaction` row in the Transaction Record Store (§4.4,
/// §3 "Transaction" invariant I-T1: monotonic, terminal thereafter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

/// Append-only per-payment audit entry (§3 "Transaction", §4.4). Owned by
/// the Transaction Record Store, which this repo implements in-process
/// inside `payment-orchestrator` (§5 of SPEC_FULL).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: TransactionId,
    pub reference_number: String,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub status: TransactionStatus,
    pub payment_id: PaymentId,
    pub reservation_id: ReservationId,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new_pending(
        payment_id: PaymentId,
        reservation_id: ReservationId,
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: i64,
        currency: Currency,
        reference_number: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            reference_number,
            source_account_id,
            destination_account_id,
            amount,
            currency,
            status: TransactionStatus::Pending,
            payment_id,
            reservation_id,
            failure_reason: None,
            created_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, TransactionStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_pending() {
        let tx = Transaction::new_pending(
            PaymentId::new(),
            ReservationId::new(),
            AccountId::new(),
            AccountId::new(),
            500,
            Currency::new("USD").unwrap(),
            "TX-1".to_string(),
        );
        assert!(tx.is_pending());
        assert!(tx.completed_at.is_none());
        assert!(tx.failure_reason.is_none());
    }

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }
}
