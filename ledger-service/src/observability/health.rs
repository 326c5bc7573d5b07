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

/// Checks the Ledger's two real dependencies: Postgres (the system of
/// record) and Redis (the optional balance-read cache). There is no Kafka
/// dependency here — the Ledger "never calls other services" (§1).
pub struct HealthChecker {
    pool: PgPool,
    redis_client: redis::Client,
    start_time: std::time::Instant,
}

impl HealthChecker {
    pub fn new(pool: PgPool, redis_client: redis::Client) -> Self {
        Self {
            pool,
            redis_client,
            start_time: std::time::Instant::now(),
        }
    }

    pub async fn check_all(&self) -> AggregatedHealth {
        let dependencies = vec![self.check_database().await, self.check_redis().await];
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
            // Redis is a cache, not a system of record — unreachable Redis
            // degrades the GetBalance fast path, it never takes the Ledger down.
            Err(e) => DependencyHealth::degraded("redis", format!("connection failed: {e}")),
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
            DependencyHealth::degraded("redis", "slow"),
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
