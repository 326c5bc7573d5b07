//! The Payment Orchestrator saga (§4.6 "the hardest single piece of
//! logic"). One `Payment` record advances through states, coordinating
//! external calls to the Ledger and the Transaction Record Store with
//! best-effort compensation. Each saga step is its own round trip and its
//! own persisted write — there is no single database transaction spanning
//! `ProcessPayment` (§9 "the saga does not hold one transaction across its
//! whole run").

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledger_core::dto::{
    CommitReservationRequest, CompleteTransactionRequest, CreateTransactionRequest,
    CreditBalanceRequest, FailTransactionRequest, GetBalanceRequest, ReleaseReservationRequest,
    ReserveBalanceRequest,
};
use ledger_core::{AccountId, AppError, Currency, LedgerClient, Result, TransactionRecordClient};
use uuid::Uuid;

use crate::events::{EventPublisher, PaymentEventPayload, PaymentEventType};
use crate::models::payment::{Payment, PaymentStatus};
use crate::repositories::PaymentRepository;

/// Reconciliation-worthy failure reason recorded when `CreditBalance`
/// succeeds but the matching `CommitReservation` does not (§7 "partial
/// commit anomaly"). Carries enough to locate the three entities involved.
pub const PARTIAL_COMMIT_ANOMALY: &str = "PARTIAL_COMMIT_ANOMALY";

/// Default per-RPC deadline (§5 "every outbound RPC must respect a
/// deadline"). Applied by the `reqwest`-based `LedgerClient`, not here —
/// this constant documents the orchestrator's expectation of its clients.
pub const DEFAULT_RPC_DEADLINE: Duration = Duration::from_secs(10);

pub struct PaymentOrchestrator {
    payments: PaymentRepository,
    ledger: Arc<dyn LedgerClient>,
    txrecord: Arc<dyn TransactionRecordClient>,
    events: Arc<EventPublisher>,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: PaymentRepository,
        ledger: Arc<dyn LedgerClient>,
        txrecord: Arc<dyn TransactionRecordClient>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self {
            payments,
            ledger,
            txrecord,
            events,
        }
    }

    fn envelope(payment: &Payment, event_type: PaymentEventType) -> PaymentEventPayload {
        PaymentEventPayload {
            event_id: Uuid::new_v4(),
            event_type,
            event_timestamp: Utc::now(),
            event_version: "1.0".to_string(),
            payment_id: payment.id,
            reference_number: payment.reference_number.clone(),
            source_account_id: payment.source_account_id,
            destination_account_id: payment.destination_account_id,
            amount: payment.amount,
            currency: payment.currency.as_str().to_string(),
            payment_status: status_str(payment.status).to_string(),
            reservation_id: payment.reservation_id,
            description: format!("payment {} {}", payment.amount, payment.currency.as_str()),
            failure_reason: payment.failure_reason.clone(),
        }
    }

    /// `CreatePayment` (§4.6). Existence of both accounts is verified via
    /// `GetBalance` as an existence probe, not because the balance value is
    /// needed here.
    pub async fn create_payment(
        &self,
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: i64,
        currency: Currency,
    ) -> Result<Payment> {
        self.probe_account_exists(source_account_id).await?;
        self.probe_account_exists(destination_account_id).await?;

        let payment = Payment::new(source_account_id, destination_account_id, amount, currency)?;
        self.payments.insert(&payment).await?;
        self.events
            .publish_payment_event(&Self::envelope(&payment, PaymentEventType::PaymentInitiated))
            .await;

        Ok(payment)
    }

    /// Plain lookup, used by the `GET /v1/payments/:id` route. Not itself
    /// part of the saga.
    pub async fn get_payment(&self, payment_id: ledger_core::PaymentId) -> Result<Payment> {
        self.payments.find_by_id(payment_id).await
    }

    async fn probe_account_exists(&self, account_id: AccountId) -> Result<()> {
        self.ledger
            .get_balance(GetBalanceRequest { account_id })
            .await
            .map(|_| ())
    }

    /// `ProcessPayment` (§4.6). Runs the 6-step saga table. Idempotency is
    /// carried by `payment.idempotency_key` through steps 1 and 2, and by
    /// `transaction_id` through step 4, so a second invocation against a
    /// PROCESSING-stuck record converges rather than double-spending (§9
    /// "Idempotency of ProcessPayment").
    pub async fn process_payment(&self, payment_id: ledger_core::PaymentId) -> Result<Payment> {
        let mut payment = self.payments.find_by_id(payment_id).await?;
        if !payment.can_process() {
            return Err(AppError::InvalidArgument(format!(
                "payment {} is not PENDING (status: {:?})",
                payment.id, payment.status
            )));
        }

        // Step 0: PENDING -> PROCESSING.
        payment.status = PaymentStatus::Processing;
        payment.updated_at = Utc::now();
        self.payments.save(&payment).await?;
        self.events
            .publish_payment_event(&Self::envelope(&payment, PaymentEventType::PaymentProcessing))
            .await;

        if let Err(err) = self.run_saga_steps(&mut payment).await {
            return self.finish_failed(payment, err).await;
        }

        crate::observability::get_metrics().record_payment_status(status_str(payment.status));
        Ok(payment)
    }

    async fn run_saga_steps(&self, payment: &mut Payment) -> Result<()> {
        // Step 1: reserve funds on the source account.
        let reservation = self
            .ledger
            .reserve_balance(ReserveBalanceRequest {
                account_id: payment.source_account_id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                idempotency_key: payment.idempotency_key.clone(),
            })
            .await?;
        payment.reservation_id = Some(reservation.reservation_id);
        self.payments.save(payment).await?;

        // Step 2: create the transaction record. Compensation on failure:
        // release the reservation, nothing was ever credited.
        let transaction = match self
            .txrecord
            .create_transaction(CreateTransactionRequest {
                payment_id: payment.id,
                reservation_id: reservation.reservation_id,
                source_account_id: payment.source_account_id,
                destination_account_id: payment.destination_account_id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                idempotency_key: payment.idempotency_key.clone(),
            })
            .await
        {
            Ok(tx) => tx,
            Err(err) => {
                self.compensate_release(payment, reservation.reservation_id, "tx-create-failed")
                    .await;
                return Err(err);
            }
        };
        payment.transaction_id = Some(transaction.transaction_id);
        self.payments.save(payment).await?;

        // Step 3: credit the destination. Compensation on failure: fail the
        // transaction record AND release the reservation — nothing was
        // ever debited, so releasing (not crediting back) is correct.
        if let Err(err) = self
            .ledger
            .credit_balance(CreditBalanceRequest {
                account_id: payment.destination_account_id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                reference_id: transaction.transaction_id.to_string(),
            })
            .await
        {
            let reason = err.to_string();
            if let Err(fail_err) = self
                .txrecord
                .fail_transaction(FailTransactionRequest {
                    transaction_id: transaction.transaction_id,
                    reason: reason.clone(),
                })
                .await
            {
                payment.append_compensation_warning("transaction fail", &fail_err);
            }
            self.compensate_release(payment, reservation.reservation_id, &reason)
                .await;
            return Err(err);
        }

        // Step 4: commit the reservation against the now-credited transfer.
        // A failure here is the partial-commit anomaly (§7): the credit has
        // already happened and must not be reversed. We record the anomaly
        // and stop; a later retry of ProcessPayment with the same
        // transaction_id is the sanctioned recovery path, not a local
        // rollback.
        if let Err(err) = self
            .ledger
            .commit_reservation(CommitReservationRequest {
                reservation_id: reservation.reservation_id,
                transaction_id: transaction.transaction_id,
            })
            .await
        {
            payment.failure_reason = Some(format!(
                "{PARTIAL_COMMIT_ANOMALY}: payment_id={}, reservation_id={}, transaction_id={}: {err}",
                payment.id, reservation.reservation_id, transaction.transaction_id
            ));
            crate::observability::get_metrics().record_partial_commit_anomaly();
            return Err(err);
        }

        // Step 5: complete the transaction record and the payment.
        if let Err(err) = self
            .txrecord
            .complete_transaction(CompleteTransactionRequest {
                transaction_id: transaction.transaction_id,
            })
            .await
        {
            // Best-effort only: the reservation is already committed, the
            // credit already applied. Leave the payment PROCESSING for
            // manual completion rather than marking it FAILED, per §4.6
            // step 5 "do not roll back prior steps".
            tracing::error!(
                payment_id = %payment.id,
                transaction_id = %transaction.transaction_id,
                %err,
                "failed to mark transaction completed after successful commit; payment left PROCESSING"
            );
            return Ok(());
        }

        payment.status = PaymentStatus::Completed;
        payment.processed_at = Some(Utc::now());
        payment.updated_at = Utc::now();
        self.payments.save(payment).await?;
        self.events
            .publish_payment_event(&Self::envelope(payment, PaymentEventType::PaymentCompleted))
            .await;

        Ok(())
    }

    async fn compensate_release(&self, payment: &mut Payment, reservation_id: ledger_core::ReservationId, reason: &str) {
        if let Err(err) = self
            .ledger
            .release_reservation(ReleaseReservationRequest {
                reservation_id,
                reason: reason.to_string(),
            })
            .await
        {
            payment.append_compensation_warning("reservation release", &err);
        } else {
            crate::observability::get_metrics().record_compensation("reservation_release");
        }
    }

    async fn finish_failed(&self, mut payment: Payment, err: AppError) -> Result<Payment> {
        // PARTIAL_COMMIT_ANOMALY already stamped its own failure_reason.
        if payment.failure_reason.is_none() {
            payment.failure_reason = Some(err.to_string());
        }
        payment.status = PaymentStatus::Failed;
        payment.updated_at = Utc::now();
        self.payments.save(&payment).await?;
        self.events
            .publish_payment_event(&Self::envelope(&payment, PaymentEventType::PaymentFailed))
            .await;
        crate::observability::get_metrics().record_payment_status("FAILED");

        Ok(payment)
    }

    /// `CancelPayment` (§4.6). Allowed only from PENDING or PROCESSING.
    pub async fn cancel_payment(&self, payment_id: ledger_core::PaymentId) -> Result<Payment> {
        let mut payment = self.payments.find_by_id(payment_id).await?;
        if !payment.can_cancel() {
            return Err(AppError::InvalidArgument(format!(
                "payment {} cannot be cancelled (status: {:?})",
                payment.id, payment.status
            )));
        }

        if let Some(reservation_id) = payment.reservation_id {
            self.compensate_release(&mut payment, reservation_id, "user cancellation")
                .await;
        }

        payment.status = PaymentStatus::Cancelled;
        payment.updated_at = Utc::now();
        self.payments.save(&payment).await?;
        self.events
            .publish_payment_event(&Self::envelope(&payment, PaymentEventType::PaymentCancelled))
            .await;
        crate::observability::get_metrics().record_payment_status("CANCELLED");

        Ok(payment)
    }
}

fn status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Processing => "PROCESSING",
        PaymentStatus::Completed => "COMPLETED",
        PaymentStatus::Failed => "FAILED",
        PaymentStatus::Cancelled => "CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_commit_anomaly_is_a_distinguished_string() {
        assert_eq!(PARTIAL_COMMIT_ANOMALY, "PARTIAL_COMMIT_ANOMALY");
    }
}
