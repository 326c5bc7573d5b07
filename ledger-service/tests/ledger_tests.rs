mod common;

use ledger_core::dto::{
    CommitReservationRequest, CreditBalanceRequest, ReleaseReservationRequest,
    ReserveBalanceRequest,
};
use ledger_core::Currency;
use ledger_service::LedgerEngine;
use uuid::Uuid;

fn engine(pool: sqlx::PgPool) -> LedgerEngine {
    LedgerEngine::new(pool, None, chrono::Duration::minutes(15))
}

#[tokio::test]
async fn reserve_commit_credit_moves_funds_between_accounts() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let source = common::insert_account(&pool, 1000, "USD", true).await;
    let dest = common::insert_account(&pool, 0, "USD", true).await;
    let engine = engine(pool.clone());

    let reservation = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: source,
            amount: 250,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: format!("idem-{}", Uuid::new_v4()),
        })
        .await
        .expect("reserve should succeed");

    let source_balance = engine.get_balance(source).await.unwrap();
    assert_eq!(source_balance.available, 750);

    let transaction_id = ledger_core::TransactionId::new();
    engine
        .commit_reservation(CommitReservationRequest {
            reservation_id: reservation.reservation_id,
            transaction_id,
        })
        .await
        .expect("commit should succeed");

    engine
        .credit_balance(CreditBalanceRequest {
            account_id: dest,
            amount: 250,
            currency: Currency::new("USD").unwrap(),
            reference_id: transaction_id.to_string(),
        })
        .await
        .expect("credit should succeed");

    let source_balance = engine.get_balance(source).await.unwrap();
    let dest_balance = engine.get_balance(dest).await.unwrap();
    assert_eq!(source_balance.available, 750);
    assert_eq!(dest_balance.available, 250);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn reserve_balance_is_idempotent_on_key() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let account = common::insert_account(&pool, 1000, "USD", true).await;
    let engine = engine(pool.clone());
    let key = format!("idem-{}", Uuid::new_v4());

    let first = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 100,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: key.clone(),
        })
        .await
        .unwrap();

    let second = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 200,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: key,
        })
        .await
        .unwrap();

    assert_eq!(first.reservation_id, second.reservation_id);
    let balance = engine.get_balance(account).await.unwrap();
    assert_eq!(balance.available, 900);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn reserve_balance_rejects_insufficient_funds() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let account = common::insert_account(&pool, 100, "USD", true).await;
    let engine = engine(pool.clone());

    let err = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 500,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: format!("idem-{}", Uuid::new_v4()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ledger_core::AppError::FailedPrecondition(_)));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn release_reservation_does_not_move_balance() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let account = common::insert_account(&pool, 1000, "USD", true).await;
    let engine = engine(pool.clone());

    let reservation = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 400,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: format!("idem-{}", Uuid::new_v4()),
        })
        .await
        .unwrap();

    engine
        .release_reservation(ReleaseReservationRequest {
            reservation_id: reservation.reservation_id,
            reason: "user cancellation".to_string(),
        })
        .await
        .unwrap();

    let balance = engine.get_balance(account).await.unwrap();
    assert_eq!(balance.available, 1000);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn commit_on_already_committed_reservation_fails() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let account = common::insert_account(&pool, 1000, "USD", true).await;
    let engine = engine(pool.clone());

    let reservation = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 300,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: format!("idem-{}", Uuid::new_v4()),
        })
        .await
        .unwrap();

    let transaction_id = ledger_core::TransactionId::new();
    engine
        .commit_reservation(CommitReservationRequest {
            reservation_id: reservation.reservation_id,
            transaction_id,
        })
        .await
        .unwrap();

    let err = engine
        .commit_reservation(CommitReservationRequest {
            reservation_id: reservation.reservation_id,
            transaction_id,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ledger_core::AppError::FailedPrecondition(_)));

    let balance = engine.get_balance(account).await.unwrap();
    assert_eq!(balance.available, 700);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn inactive_account_rejects_reservation() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let account = common::insert_account(&pool, 1000, "USD", false).await;
    let engine = engine(pool.clone());

    let err = engine
        .reserve_balance(ReserveBalanceRequest {
            account_id: account,
            amount: 100,
            currency: Currency::new("USD").unwrap(),
            idempotency_key: format!("idem-{}", Uuid::new_v4()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ledger_core::AppError::FailedPrecondition(_)));

    common::cleanup_test_data(&pool).await;
}
