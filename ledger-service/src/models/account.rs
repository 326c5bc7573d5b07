use chrono::{DateTime, Utc};
use ledger_core::{AccountId, Currency};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account owned by the Balance Store (§3 "Account").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: AccountId,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub balance: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_usable(&self) -> bool {
        self.active
    }

    /// Available balance given the account's own row, before subtracting
    /// pending reservations (that sum is computed separately against the
    /// Reservation Store — see `ReservationRepository::pending_total`).
    pub fn raw_balance(&self) -> i64 {
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: i64, active: bool) -> Account {
        Account {
            id: AccountId::new(),
            currency: Currency::new("USD").unwrap(),
            balance,
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_account_is_unusable() {
        assert!(!account(100, false).is_usable());
        assert!(account(100, true).is_usable());
    }
}
