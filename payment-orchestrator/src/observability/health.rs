use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
}

impl DependencyHealth {
    pub fn healthy(name: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

impl AggregatedHealth {
    fn aggregate_status(dependencies: &[DependencyHealth]) -> HealthStatus {
        if dependencies.iter().any(|d| d.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if dependencies.iter().any(|d| d.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Checks the Orchestrator's three dependencies: Postgres (payments,
/// transactions, idempotency_keys — all owned by this service per
/// SPEC_FULL §5/§7), Redis (idempotency fast path), and Kafka (the Event
/// Publisher, §4.5). Unlike the Ledger, a missing Kafka client degrades
/// rather than fails health — publish failures never block a saga step.
pub struct HealthChecker {
    pool: PgPool,
    redis_client: redis::Client,
    kafka_connected: bool,
    start_time: std::time::Instant,
}

impl HealthChecker {
    pub fn new(pool: PgPool, redis_client: redis::Client, kafka_connected: bool) -> Self {
        Self {
            pool,
            redis_client,
            kafka_connected,
            start_time: std::time::Instant::now(),
        }
    }

    pub async fn check_all(&self) -> AggregatedHealth {
        let dependencies = vec![
            self.check_database().await,
            self.check_redis().await,
            self.check_kafka(),
        ];
        AggregatedHealth {
            status: AggregatedHealth::aggregate_status(&dependencies),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            dependencies,
        }
    }

    pub async fn check_database(&self) -> DependencyHealth {
        let start = std::time::Instant::now();
        match tokio::time::timeout(Duration::from_secs(5), sqlx::query("SELECT 1").fetch_one(&self.pool)).await {
            Ok(Ok(_)) => DependencyHealth::healthy("database", start.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => DependencyHealth::unhealthy("database", format!("query failed: {e}")),
            Err(_) => DependencyHealth::unhealthy("database", "connection timeout"),
        }
    }

    pub async fn check_redis(&self) -> DependencyHealth {
        let start = std::time::Instant::now();
        match self.redis_client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                match tokio::time::timeout(
                    Duration::from_secs(5),
                    redis::cmd("PING").query_async::<_, ()>(&mut conn),
                )
                .await
                {
                    Ok(Ok(_)) => DependencyHealth::healthy("redis", start.elapsed().as_secs_f64() * 1000.0),
                    Ok(Err(e)) => DependencyHealth::degraded("redis", format!("ping failed: {e}")),
                    Err(_) => DependencyHealth::degraded("redis", "ping timeout"),
                }
            }
            // Redis only backs the idempotency fast path here — a miss
            // degrades to the Postgres system of record (HybridIdempotencyStore).
            Err(e) => DependencyHealth::degraded("redis", format!("connection failed: {e}")),
        }
    }

    /// Kafka health is a point-in-time snapshot of whether `EventPublisher`
    /// connected at startup; publish failures afterward are logged, not
    /// surfaced here (§4.5 "never blocks or fails the calling saga step").
    pub fn check_kafka(&self) -> DependencyHealth {
        if self.kafka_connected {
            DependencyHealth::healthy("kafka", 0.0)
        } else {
            DependencyHealth::degraded("kafka", "event publisher not connected")
        }
    }

    pub fn is_alive(&self) -> bool {
        true
    }

    pub async fn is_ready(&self) -> bool {
        self.check_database().await.status.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_status_escalates_to_worst_dependency() {
        let all_healthy = vec![DependencyHealth::healthy("db", 1.0)];
        assert_eq!(
            AggregatedHealth::aggregate_status(&all_healthy),
            HealthStatus::Healthy
        );

        let one_degraded = vec![
            DependencyHealth::healthy("db", 1.0),
            DependencyHealth::degraded("kafka", "not connected"),
        ];
        assert_eq!(
            AggregatedHealth::aggregate_status(&one_degraded),
            HealthStatus::Degraded
        );

        let one_unhealthy = vec![
            DependencyHealth::healthy("db", 1.0),
            DependencyHealth::unhealthy("redis", "down"),
        ];
        assert_eq!(
            AggregatedHealth::aggregate_status(&one_unhealthy),
            HealthStatus::Unhealthy
        );
    }
}
