use chrono::{DateTime, Utc};
use ledger_core::{AccountId, Currency, ReservationId, TransactionId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of a `Reservation` in the state machine of §4.3.
///
/// Transitions only PENDING->COMMITTED or PENDING->RELEASED (I-R2); both
/// COMMITTED and RELEASED are terminal (INV-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Committed,
    Released,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Committed | ReservationStatus::Released)
    }
}

/// A hold placed against an account's balance. Owned by the Reservation
/// Store (§3 "Reservation"); never deleted, only transitioned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: ReservationId,
    pub account_id: AccountId,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub status: ReservationStatus,
    pub idempotency_key: String,
    pub transaction_id: Option<TransactionId>,
    pub release_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub committed_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new_pending(
        account_id: AccountId,
        amount: i64,
        currency: Currency,
        idempotency_key: String,
        ttl: chrono::Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReservationId::new(),
            account_id,
            amount,
            currency,
            status: ReservationStatus::Pending,
            idempotency_key,
            transaction_id: None,
            release_reason: None,
            expires_at: now + ttl,
            created_at: now,
            committed_at: None,
            released_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ReservationStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reservation_is_pending_with_no_terminal_timestamps() {
        let r = Reservation::new_pending(
            AccountId::new(),
            500,
            Currency::new("USD").unwrap(),
            "idem-1".to_string(),
            chrono::Duration::minutes(15),
        );
        assert!(r.is_pending());
        assert!(r.committed_at.is_none());
        assert!(r.released_at.is_none());
        assert!(r.expires_at > r.created_at);
    }

    #[test]
    fn committed_and_released_are_terminal() {
        assert!(ReservationStatus::Committed.is_terminal());
        assert!(ReservationStatus::Released.is_terminal());
        assert!(!ReservationStatus::Pending.is_terminal());
    }
}
