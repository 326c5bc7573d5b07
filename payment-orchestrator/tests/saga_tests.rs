mod common;

use std::sync::Arc;

use async_trait::async_trait;
use ledger_core::dto::*;
use ledger_core::{AccountId, AppError, Currency, LedgerClient, Result, TransactionRecordClient};
use payment_orchestrator::events::{EventPublisher, ProducerConfig};
use payment_orchestrator::models::payment::PaymentStatus;
use payment_orchestrator::repositories::PaymentRepository;
use payment_orchestrator::PaymentOrchestrator;

mockall::mock! {
    pub Ledger {}

    #[async_trait]
    impl LedgerClient for Ledger {
        async fn get_balance(&self, req: GetBalanceRequest) -> Result<GetBalanceResponse>;
        async fn reserve_balance(&self, req: ReserveBalanceRequest) -> Result<ReserveBalanceResponse>;
        async fn commit_reservation(&self, req: CommitReservationRequest) -> Result<()>;
        async fn release_reservation(&self, req: ReleaseReservationRequest) -> Result<()>;
        async fn credit_balance(&self, req: CreditBalanceRequest) -> Result<CreditBalanceResponse>;
    }
}

mockall::mock! {
    pub TxRecord {}

    #[async_trait]
    impl TransactionRecordClient for TxRecord {
        async fn create_transaction(&self, req: CreateTransactionRequest) -> Result<CreateTransactionResponse>;
        async fn complete_transaction(&self, req: CompleteTransactionRequest) -> Result<()>;
        async fn fail_transaction(&self, req: FailTransactionRequest) -> Result<()>;
    }
}

fn disconnected_publisher() -> Arc<EventPublisher> {
    Arc::new(EventPublisher::new(ProducerConfig::default()))
}

#[tokio::test]
async fn process_payment_completes_happy_path() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_get_balance()
        .returning(|_| Ok(GetBalanceResponse { available: 1000, currency: Currency::new("USD").unwrap() }));
    let reservation_id = ledger_core::ReservationId::new();
    ledger.expect_reserve_balance().returning(move |_| {
        Ok(ReserveBalanceResponse { reservation_id })
    });
    ledger.expect_commit_reservation().returning(|_| Ok(()));
    ledger.expect_credit_balance().returning(|_| Ok(CreditBalanceResponse { new_balance: 250 }));

    let mut txrecord = MockTxRecord::new();
    let transaction_id = ledger_core::TransactionId::new();
    txrecord.expect_create_transaction().returning(move |req| {
        Ok(CreateTransactionResponse {
            transaction_id,
            reference_number: format!("TXN-{}", req.payment_id),
        })
    });
    txrecord.expect_complete_transaction().returning(|_| Ok(()));

    let orchestrator = PaymentOrchestrator::new(
        PaymentRepository::new(pool.clone()),
        Arc::new(ledger),
        Arc::new(txrecord),
        disconnected_publisher(),
    );

    let payment = orchestrator
        .create_payment(AccountId::new(), AccountId::new(), 250, Currency::new("USD").unwrap())
        .await
        .expect("create_payment should succeed");

    let completed = orchestrator
        .process_payment(payment.id)
        .await
        .expect("process_payment should succeed");

    assert_eq!(completed.status, PaymentStatus::Completed);
    assert_eq!(completed.reservation_id, Some(reservation_id));
    assert_eq!(completed.transaction_id, Some(transaction_id));
    assert!(completed.processed_at.is_some());

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn process_payment_releases_reservation_when_credit_fails() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_get_balance()
        .returning(|_| Ok(GetBalanceResponse { available: 1000, currency: Currency::new("USD").unwrap() }));
    let reservation_id = ledger_core::ReservationId::new();
    ledger.expect_reserve_balance().returning(move |_| Ok(ReserveBalanceResponse { reservation_id }));
    ledger
        .expect_credit_balance()
        .returning(|_| Err(AppError::FailedPrecondition("destination account inactive".to_string())));
    ledger.expect_release_reservation().returning(|_| Ok(()));

    let mut txrecord = MockTxRecord::new();
    let transaction_id = ledger_core::TransactionId::new();
    txrecord.expect_create_transaction().returning(move |req| {
        Ok(CreateTransactionResponse {
            transaction_id,
            reference_number: format!("TXN-{}", req.payment_id),
        })
    });
    txrecord.expect_fail_transaction().returning(|_| Ok(()));

    let orchestrator = PaymentOrchestrator::new(
        PaymentRepository::new(pool.clone()),
        Arc::new(ledger),
        Arc::new(txrecord),
        disconnected_publisher(),
    );

    let payment = orchestrator
        .create_payment(AccountId::new(), AccountId::new(), 250, Currency::new("USD").unwrap())
        .await
        .unwrap();

    let failed = orchestrator.process_payment(payment.id).await.unwrap();

    assert_eq!(failed.status, PaymentStatus::Failed);
    assert!(failed.failure_reason.is_some());

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn process_payment_records_partial_commit_anomaly_when_commit_fails_after_credit() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_get_balance()
        .returning(|_| Ok(GetBalanceResponse { available: 1000, currency: Currency::new("USD").unwrap() }));
    let reservation_id = ledger_core::ReservationId::new();
    ledger.expect_reserve_balance().returning(move |_| Ok(ReserveBalanceResponse { reservation_id }));
    ledger.expect_credit_balance().returning(|_| Ok(CreditBalanceResponse { new_balance: 250 }));
    ledger
        .expect_commit_reservation()
        .returning(|_| Err(AppError::DeadlineExceeded("ledger timeout".to_string())));

    let mut txrecord = MockTxRecord::new();
    let transaction_id = ledger_core::TransactionId::new();
    txrecord.expect_create_transaction().returning(move |req| {
        Ok(CreateTransactionResponse {
            transaction_id,
            reference_number: format!("TXN-{}", req.payment_id),
        })
    });

    let orchestrator = PaymentOrchestrator::new(
        PaymentRepository::new(pool.clone()),
        Arc::new(ledger),
        Arc::new(txrecord),
        disconnected_publisher(),
    );

    let payment = orchestrator
        .create_payment(AccountId::new(), AccountId::new(), 250, Currency::new("USD").unwrap())
        .await
        .unwrap();

    let failed = orchestrator.process_payment(payment.id).await.unwrap();

    assert_eq!(failed.status, PaymentStatus::Failed);
    assert!(failed
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("PARTIAL_COMMIT_ANOMALY"));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn cancel_payment_releases_reservation_and_transitions_to_cancelled() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_get_balance()
        .returning(|_| Ok(GetBalanceResponse { available: 1000, currency: Currency::new("USD").unwrap() }));
    ledger.expect_release_reservation().returning(|_| Ok(()));

    let txrecord = MockTxRecord::new();

    let orchestrator = PaymentOrchestrator::new(
        PaymentRepository::new(pool.clone()),
        Arc::new(ledger),
        Arc::new(txrecord),
        disconnected_publisher(),
    );

    let mut payment = orchestrator
        .create_payment(AccountId::new(), AccountId::new(), 100, Currency::new("USD").unwrap())
        .await
        .unwrap();
    payment.reservation_id = Some(ledger_core::ReservationId::new());
    // Simulate a payment that already acquired a reservation before cancellation
    // by writing the updated row directly, mirroring what step 1 of the saga does.
    let repo = PaymentRepository::new(pool.clone());
    repo.save(&payment).await.unwrap();

    let cancelled = orchestrator.cancel_payment(payment.id).await.unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);

    common::cleanup_test_data(&pool).await;
}
