use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use ledger_core::{AppError, Result};
use serde::{Deserialize, Serialize};

use super::key_generator::IdempotencyKeyGenerator;
use super::storage::{HybridIdempotencyStore, IdempotencyRecord, IdempotencyStatus};

#[derive(Debug, Default)]
pub struct IdempotencyMetrics {
    pub total_requests: AtomicU64,
    pub duplicate_requests: AtomicU64,
    pub new_requests: AtomicU64,
}

impl IdempotencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_new(&self) {
        self.new_requests.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub struct IdempotencyHandlerConfig {
    pub ttl_seconds: i64,
    pub key_prefix: String,
}

impl Default for IdempotencyHandlerConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86400,
            key_prefix: "idem".to_string(),
        }
    }
}

#[derive(Debug)]
enum CheckResult<T> {
    New,
    Duplicate(T),
    Processing,
}

/// Guards the externally-facing `CreatePayment` call against duplicate HTTP
/// retries (§1, §7). Distinct from, and layered on top of, the per-`Payment`
/// idempotency key used for the saga's own outbound Ledger/Transaction
/// Record Store calls (§4.6, §9) — this handler never sees those.
pub struct IdempotencyHandler {
    store: HybridIdempotencyStore,
    key_generator: IdempotencyKeyGenerator,
    metrics: Arc<IdempotencyMetrics>,
    config: IdempotencyHandlerConfig,
}

impl IdempotencyHandler {
    pub fn new(store: HybridIdempotencyStore, config: IdempotencyHandlerConfig) -> Self {
        let key_generator = IdempotencyKeyGenerator::new(config.key_prefix.clone());
        Self {
            store,
            key_generator,
            metrics: Arc::new(IdempotencyMetrics::new()),
            config,
        }
    }

    pub fn metrics(&self) -> Arc<IdempotencyMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn normalize_client_key(&self, client_key: &str) -> String {
        self.key_generator.normalize_client_key(client_key)
    }

    pub fn hash_request<T: Serialize>(&self, request: &T) -> String {
        self.key_generator.hash_request(request)
    }

    async fn check<T: for<'de> Deserialize<'de>>(
        &self,
        idempotency_key: &str,
        operation_type: &str,
        request_hash: &str,
    ) -> Result<CheckResult<T>> {
        self.metrics.record_request();

        if let Some(existing) = self.store.check_duplicate(idempotency_key).await? {
            return self.classify_existing(existing, request_hash);
        }

        let record = IdempotencyRecord::new(
            idempotency_key.to_string(),
            operation_type.to_string(),
            request_hash.to_string(),
            self.config.ttl_seconds,
        );

        match self.store.try_acquire(&record).await? {
            Some(existing) => self.classify_existing(existing, request_hash),
            None => {
                self.metrics.record_new();
                Ok(CheckResult::New)
            }
        }
    }

    fn classify_existing<T: for<'de> Deserialize<'de>>(
        &self,
        existing: IdempotencyRecord,
        request_hash: &str,
    ) -> Result<CheckResult<T>> {
        self.metrics.record_duplicate();

        if existing.request_hash != request_hash {
            return Err(AppError::InvalidArgument(
                "idempotency key reused with a different request body".to_string(),
            ));
        }

        match existing.status {
            IdempotencyStatus::Completed => {
                let response_data = existing
                    .response_data
                    .ok_or_else(|| AppError::Internal(anyhow!("completed idempotency record has no response")))?;
                let response: T = serde_json::from_value(response_data)
                    .map_err(|e| AppError::Internal(anyhow!("failed to deserialize cached response: {e}")))?;
                Ok(CheckResult::Duplicate(response))
            }
            IdempotencyStatus::Processing => Ok(CheckResult::Processing),
            IdempotencyStatus::Failed => {
                self.metrics.record_new();
                Ok(CheckResult::New)
            }
        }
    }

    async fn complete<T: Serialize>(&self, idempotency_key: &str, response: &T) -> Result<()> {
        let response_data = serde_json::to_value(response)
            .map_err(|e| AppError::Internal(anyhow!("failed to serialize response: {e}")))?;
        self.store.mark_completed(idempotency_key, response_data).await
    }

    async fn fail(&self, idempotency_key: &str, error_message: &str) -> Result<()> {
        self.store.mark_failed(idempotency_key, error_message).await
    }

    /// Runs `operation` exactly once per `idempotency_key`; replays return
    /// the cached response instead of re-running the saga's `CreatePayment`
    /// step (§7).
    pub async fn execute<T, F, Fut>(
        &self,
        idempotency_key: &str,
        operation_type: &str,
        request_hash: &str,
        operation: F,
    ) -> Result<T>
    where
        T: Serialize + for<'de> Deserialize<'de> + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.check::<T>(idempotency_key, operation_type, request_hash).await? {
            CheckResult::Duplicate(response) => return Ok(response),
            CheckResult::Processing => {
                return Err(AppError::FailedPrecondition(
                    "request with this idempotency key is still being processed".to_string(),
                ));
            }
            CheckResult::New => {}
        }

        match operation().await {
            Ok(response) => {
                if let Err(err) = self.complete(idempotency_key, &response).await {
                    tracing::error!(%err, "failed to mark idempotency key completed");
                }
                Ok(response)
            }
            Err(err) => {
                if let Err(mark_err) = self.fail(idempotency_key, &err.to_string()).await {
                    tracing::error!(%mark_err, "failed to mark idempotency key failed");
                }
                Err(err)
            }
        }
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        self.store.cleanup_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_24h_ttl() {
        let config = IdempotencyHandlerConfig::default();
        assert_eq!(config.ttl_seconds, 86400);
        assert_eq!(config.key_prefix, "idem");
    }
}
