use chrono::{DateTime, Utc};
use ledger_core::{AccountId, PaymentId, ReservationId, TransactionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Two logical topics (§4.5, §6.3) — one per entity, replacing the
/// teacher's four-topic settlement layout since this domain only has two
/// entities worth publishing about.
pub mod topics {
    pub const TRANSACTIONS: &str = "payments.transactions";
    pub const PAYMENTS: &str = "payments.payments";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionEventType {
    TransactionCreated,
    TransactionCompleted,
    TransactionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEventType {
    PaymentInitiated,
    PaymentProcessing,
    PaymentCompleted,
    PaymentFailed,
    PaymentCancelled,
}

/// Required envelope fields reproduced verbatim (§6.3) for transaction
/// events, keyed (partitioned) by `transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEventPayload {
    pub event_id: Uuid,
    pub event_type: TransactionEventType,
    pub event_timestamp: DateTime<Utc>,
    pub event_version: String,
    pub transaction_id: TransactionId,
    pub reference_number: String,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    pub currency: String,
    pub transaction_status: String,
    pub payment_id: PaymentId,
    pub description: String,
    pub failure_reason: Option<String>,
}

impl TransactionEventPayload {
    pub fn topic() -> &'static str {
        topics::TRANSACTIONS
    }

    pub fn partition_key(&self) -> String {
        self.transaction_id.to_string()
    }
}

/// Required envelope fields (§6.3) for payment events, keyed by
/// `payment_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventPayload {
    pub event_id: Uuid,
    pub event_type: PaymentEventType,
    pub event_timestamp: DateTime<Utc>,
    pub event_version: String,
    pub payment_id: PaymentId,
    pub reference_number: String,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    pub currency: String,
    pub payment_status: String,
    pub reservation_id: Option<ReservationId>,
    pub description: String,
    pub failure_reason: Option<String>,
}

impl PaymentEventPayload {
    pub fn topic() -> &'static str {
        topics::PAYMENTS
    }

    pub fn partition_key(&self) -> String {
        self.payment_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_constants_match_spec() {
        assert_eq!(topics::TRANSACTIONS, "payments.transactions");
        assert_eq!(topics::PAYMENTS, "payments.payments");
    }

    #[test]
    fn event_type_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&PaymentEventType::PaymentCompleted).unwrap();
        assert_eq!(json, "\"PAYMENT_COMPLETED\"");
        let json = serde_json::to_string(&TransactionEventType::TransactionFailed).unwrap();
        assert_eq!(json, "\"TRANSACTION_FAILED\"");
    }
}
