use ledger_core::{AccountId, AppError, Currency, Result};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/payments` (§4.6 `CreatePayment`). `client_idempotency_key`
/// guards against duplicate HTTP submissions and is distinct from the
/// per-`Payment` key the saga mints for its own outbound calls (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: i64,
    pub currency: String,
    pub client_idempotency_key: String,
}

impl CreatePaymentRequest {
    /// Hand-rolled validation, matching the teacher's `requests.rs`
    /// (field-by-field checks rather than a derive macro).
    pub fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(AppError::InvalidArgument(
                "amount must be positive".to_string(),
            ));
        }
        if self.source_account_id == self.destination_account_id {
            return Err(AppError::InvalidArgument(
                "source and destination accounts must differ".to_string(),
            ));
        }
        if self.client_idempotency_key.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "client_idempotency_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn currency(&self) -> Result<Currency> {
        Currency::new(&self.currency)
    }
}
