use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ledger_core::dto::{
    CompleteTransactionRequest, CreateTransactionRequest, CreateTransactionResponse,
    FailTransactionRequest,
};
use ledger_core::{AppError, Result, TransactionRecordClient};
use uuid::Uuid;

use crate::events::{EventPublisher, TransactionEventPayload, TransactionEventType};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::repositories::TransactionRepository;

/// In-process `TransactionRecordClient` (§6.4: "the Transaction Record
/// Store lives in-process inside the orchestrator, but the trait boundary
/// is kept distinct so splitting it into its own service later is a wiring
/// change, not a saga rewrite"). `create_transaction` is idempotent on
/// `payment_id`, reusing the payment's own idempotency key rather than
/// minting a new one (§9).
pub struct InProcessTransactionRecordClient {
    repository: TransactionRepository,
    events: Arc<EventPublisher>,
}

impl InProcessTransactionRecordClient {
    pub fn new(repository: TransactionRepository, events: Arc<EventPublisher>) -> Self {
        Self { repository, events }
    }

    fn envelope(tx: &Transaction, event_type: TransactionEventType) -> TransactionEventPayload {
        TransactionEventPayload {
            event_id: Uuid::new_v4(),
            event_type,
            event_timestamp: Utc::now(),
            event_version: "1.0".to_string(),
            transaction_id: tx.id,
            reference_number: tx.reference_number.clone(),
            source_account_id: tx.source_account_id,
            destination_account_id: tx.destination_account_id,
            amount: tx.amount,
            currency: tx.currency.as_str().to_string(),
            transaction_status: status_str(tx.status).to_string(),
            payment_id: tx.payment_id,
            description: format!("transfer {} {}", tx.amount, tx.currency.as_str()),
            failure_reason: tx.failure_reason.clone(),
        }
    }
}

fn status_str(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "PENDING",
        TransactionStatus::Completed => "COMPLETED",
        TransactionStatus::Failed => "FAILED",
    }
}

#[async_trait]
impl TransactionRecordClient for InProcessTransactionRecordClient {
    async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse> {
        if let Some(existing) = self.repository.find_by_payment_id(req.payment_id).await? {
            return Ok(CreateTransactionResponse {
                transaction_id: existing.id,
                reference_number: existing.reference_number,
            });
        }

        let reference_number = format!("TXN-{}", Uuid::new_v4().simple());
        let transaction = Transaction::new_pending(
            req.payment_id,
            req.reservation_id,
            req.source_account_id,
            req.destination_account_id,
            req.amount,
            req.currency,
            reference_number.clone(),
        );

        self.repository.insert(&transaction).await?;
        self.events
            .publish_transaction_event(&Self::envelope(&transaction, TransactionEventType::TransactionCreated))
            .await;

        Ok(CreateTransactionResponse {
            transaction_id: transaction.id,
            reference_number,
        })
    }

    async fn complete_transaction(&self, req: CompleteTransactionRequest) -> Result<()> {
        let mut transaction = self.repository.find_by_id(req.transaction_id).await?;
        if transaction.status.is_terminal() {
            return Ok(());
        }

        transaction.status = TransactionStatus::Completed;
        transaction.completed_at = Some(Utc::now());
        transaction.updated_at = Utc::now();
        self.repository.save(&transaction).await?;

        self.events
            .publish_transaction_event(&Self::envelope(&transaction, TransactionEventType::TransactionCompleted))
            .await;
        Ok(())
    }

    async fn fail_transaction(&self, req: FailTransactionRequest) -> Result<()> {
        let mut transaction = self.repository.find_by_id(req.transaction_id).await?;
        if transaction.status.is_terminal() {
            return Err(AppError::FailedPrecondition(format!(
                "transaction {} is already terminal",
                transaction.id
            )));
        }

        transaction.status = TransactionStatus::Failed;
        transaction.failure_reason = Some(req.reason);
        transaction.updated_at = Utc::now();
        self.repository.save(&transaction).await?;

        self.events
            .publish_transaction_event(&Self::envelope(&transaction, TransactionEventType::TransactionFailed))
            .await;
        Ok(())
    }
}
