use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use ledger_core::{AppError, Result};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
pub enum IdempotencyStatus {
    Processing,
    Completed,
    Failed,
}

/// A row in the `idempotency_keys` table. Keyed on the client-provided
/// `idempotency_key` for `CreatePayment` HTTP retries — unrelated to the
/// ledger-facing idempotency keys minted per `Payment` (§4.6, §9).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub idempotency_key: String,
    pub operation_type: String,
    pub status: IdempotencyStatus,
    pub request_hash: String,
    pub response_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IdempotencyRecord {
    pub fn new(idempotency_key: String, operation_type: String, request_hash: String, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            idempotency_key,
            operation_type,
            status: IdempotencyStatus::Processing,
            request_hash,
            response_data: None,
            error_message: None,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            completed_at: None,
        }
    }
}

pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` if the key was newly inserted, `Some(existing)` if a
    /// row for this key already existed (duplicate request).
    pub async fn try_acquire(&self, record: &IdempotencyRecord) -> Result<Option<IdempotencyRecord>> {
        let existing = sqlx::query_as::<_, IdempotencyRecord>(
            r#"
            INSERT INTO idempotency_keys
                (id, idempotency_key, operation_type, status, request_hash, response_data, error_message, created_at, expires_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (idempotency_key) DO UPDATE SET idempotency_key = idempotency_keys.idempotency_key
            RETURNING id, idempotency_key, operation_type, status, request_hash, response_data, error_message, created_at, expires_at, completed_at
            "#,
        )
        .bind(record.id)
        .bind(&record.idempotency_key)
        .bind(&record.operation_type)
        .bind(record.status)
        .bind(&record.request_hash)
        .bind(&record.response_data)
        .bind(&record.error_message)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if existing.id == record.id {
            Ok(None)
        } else {
            Ok(Some(existing))
        }
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        sqlx::query_as::<_, IdempotencyRecord>(
            r#"
            SELECT id, idempotency_key, operation_type, status, request_hash, response_data, error_message, created_at, expires_at, completed_at
            FROM idempotency_keys
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn mark_completed(&self, key: &str, response_data: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET status = 'COMPLETED', response_data = $2, completed_at = NOW()
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .bind(response_data)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn mark_failed(&self, key: &str, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET status = 'FAILED', error_message = $2, completed_at = NOW()
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}

/// Redis fast path for the hybrid store. Errors are mapped to
/// `AppError::Internal` rather than given their own variant, keeping the
/// shared error taxonomy closed (§7); a Redis outage degrades
/// `HybridIdempotencyStore` to Postgres-only rather than failing requests.
pub struct RedisIdempotencyCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisIdempotencyCache {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn make_key(&self, idempotency_key: &str) -> String {
        format!("{}:{}", self.key_prefix, idempotency_key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(anyhow!("redis connection failed: {e}")))
    }

    pub async fn try_set(&self, idempotency_key: &str, ttl_seconds: i64) -> Result<bool> {
        let mut conn = self.connection().await?;
        let key = self.make_key(idempotency_key);
        let result: Option<String> = conn
            .set_options(
                &key,
                "processing",
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::EX(ttl_seconds as usize)),
            )
            .await
            .map_err(|e| AppError::Internal(anyhow!("redis SET NX failed: {e}")))?;

        Ok(result.is_some())
    }

    pub async fn exists(&self, idempotency_key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let key = self.make_key(idempotency_key);
        conn.exists(&key)
            .await
            .map_err(|e| AppError::Internal(anyhow!("redis EXISTS failed: {e}")))
    }

    pub async fn delete(&self, idempotency_key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let key = self.make_key(idempotency_key);
        let _: i64 = conn
            .del(&key)
            .await
            .map_err(|e| AppError::Internal(anyhow!("redis DEL failed: {e}")))?;
        Ok(())
    }
}

/// Combines the Redis fast path with Postgres as the system of record, per
/// SPEC_FULL §7's `HybridIdempotencyStore`.
pub struct HybridIdempotencyStore {
    postgres: PostgresIdempotencyStore,
    redis: Option<RedisIdempotencyCache>,
    ttl_seconds: i64,
}

impl HybridIdempotencyStore {
    pub fn new(postgres: PostgresIdempotencyStore, redis: Option<RedisIdempotencyCache>, ttl_seconds: i64) -> Self {
        Self {
            postgres,
            redis,
            ttl_seconds,
        }
    }

    pub async fn check_duplicate(&self, idempotency_key: &str) -> Result<Option<IdempotencyRecord>> {
        if let Some(redis) = &self.redis {
            match redis.exists(idempotency_key).await {
                Ok(true) => return self.postgres.find_by_key(idempotency_key).await,
                Ok(false) => {}
                Err(err) => tracing::warn!(%err, "redis idempotency lookup failed, falling back to postgres"),
            }
        }
        self.postgres.find_by_key(idempotency_key).await
    }

    pub async fn try_acquire(&self, record: &IdempotencyRecord) -> Result<Option<IdempotencyRecord>> {
        if let Some(redis) = &self.redis {
            match redis.try_set(&record.idempotency_key, self.ttl_seconds).await {
                Ok(false) => return self.postgres.find_by_key(&record.idempotency_key).await,
                Ok(true) => {}
                Err(err) => tracing::warn!(%err, "redis idempotency lock failed, falling back to postgres"),
            }
        }
        self.postgres.try_acquire(record).await
    }

    pub async fn mark_completed(&self, idempotency_key: &str, response_data: serde_json::Value) -> Result<()> {
        self.postgres.mark_completed(idempotency_key, response_data).await?;
        if let Some(redis) = &self.redis {
            if let Err(err) = redis.delete(idempotency_key).await {
                tracing::warn!(%err, "failed to clear redis idempotency lock after completion");
            }
        }
        Ok(())
    }

    pub async fn mark_failed(&self, idempotency_key: &str, error_message: &str) -> Result<()> {
        self.postgres.mark_failed(idempotency_key, error_message).await?;
        if let Some(redis) = &self.redis {
            redis.delete(idempotency_key).await.ok();
        }
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        self.postgres.cleanup_expired().await
    }
}
