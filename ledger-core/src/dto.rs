//! Wire DTOs for the Ledger RPC surface (§6.1) and the Transaction Record
//! RPC surface (§6.2). These are transport-neutral; `ledger-service` wraps
//! them in its `ApiResponse<T>` HTTP envelope and `payment-orchestrator`'s
//! `reqwest`-based client serializes them as JSON bodies.

use crate::ids::{AccountId, PaymentId, ReservationId, TransactionId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceRequest {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceResponse {
    pub available: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveBalanceRequest {
    pub account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveBalanceResponse {
    pub reservation_id: ReservationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReservationRequest {
    pub reservation_id: ReservationId,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseReservationRequest {
    pub reservation_id: ReservationId,
    pub reason: String,
}

/// Real, unambiguous unit payload for routes with nothing to return.
/// Serializes as `{}`, not `null` — `()` would serialize/deserialize as
/// `null`, indistinguishable on the wire from an absent `data` field, so
/// `CommitReservation`/`ReleaseReservation` use this instead of `Result<()>`
/// DTOs at the transport boundary (§6.1).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalanceRequest {
    pub account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalanceResponse {
    pub new_balance: i64,
}

impl ReserveBalanceRequest {
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }
}

impl CreditBalanceRequest {
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }
}

// -- Transaction Record RPC surface (§6.2) --------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub payment_id: PaymentId,
    pub reservation_id: ReservationId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionResponse {
    pub transaction_id: TransactionId,
    pub reference_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTransactionRequest {
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailTransactionRequest {
    pub transaction_id: TransactionId,
    pub reason: String,
}
