mod common;

use payment_orchestrator::idempotency::{
    HybridIdempotencyStore, IdempotencyHandler, IdempotencyHandlerConfig, PostgresIdempotencyStore,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Echo {
    value: i64,
}

fn handler(pool: sqlx::PgPool) -> IdempotencyHandler {
    let store = HybridIdempotencyStore::new(PostgresIdempotencyStore::new(pool), None, 86400);
    IdempotencyHandler::new(store, IdempotencyHandlerConfig::default())
}

#[tokio::test]
async fn execute_runs_operation_once_per_key() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let handler = handler(pool.clone());
    let key = format!("idem-{}", Uuid::new_v4());
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let result = handler
            .execute::<Echo, _, _>(&key, "create_payment", "hash-a", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Echo { value: 42 })
                }
            })
            .await
            .unwrap();
        assert_eq!(result.value, 42);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn execute_rejects_same_key_with_different_request_hash() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let handler = handler(pool.clone());
    let key = format!("idem-{}", Uuid::new_v4());

    handler
        .execute::<Echo, _, _>(&key, "create_payment", "hash-a", || async { Ok(Echo { value: 1 }) })
        .await
        .unwrap();

    let err = handler
        .execute::<Echo, _, _>(&key, "create_payment", "hash-b", || async { Ok(Echo { value: 2 }) })
        .await
        .unwrap_err();

    assert!(matches!(err, ledger_core::AppError::InvalidArgument(_)));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn failed_operation_can_be_retried_under_the_same_key() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let handler = handler(pool.clone());
    let key = format!("idem-{}", Uuid::new_v4());

    let first = handler
        .execute::<Echo, _, _>(&key, "create_payment", "hash-a", || async {
            Err(ledger_core::AppError::Internal(anyhow::anyhow!("boom")))
        })
        .await;
    assert!(first.is_err());

    let second = handler
        .execute::<Echo, _, _>(&key, "create_payment", "hash-a", || async { Ok(Echo { value: 7 }) })
        .await
        .unwrap();
    assert_eq!(second.value, 7);

    common::cleanup_test_data(&pool).await;
}
