use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use super::handlers;
use crate::observability::HealthChecker;
use crate::service::LedgerEngine;

/// Application state shared across handlers (teacher's `AppState` shape,
/// narrowed to the Ledger's two real dependencies — Postgres via `engine`
/// and Redis via the cache `engine` already wraps — since the Ledger
/// "never calls other services", §1).
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
    pub health_checker: Arc<HealthChecker>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: Arc<LedgerEngine>, health_checker: Arc<HealthChecker>) -> Self {
        Self {
            engine,
            health_checker,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the `LedgerService` router (§6.1): five RPC routes plus the
/// ambient health/readiness/liveness/metrics endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/v1/accounts/:account_id/balance", get(handlers::get_balance))
        .route("/v1/reservations", post(handlers::reserve_balance))
        .route("/v1/reservations/commit", post(handlers::commit_reservation))
        .route("/v1/reservations/release", post(handlers::release_reservation))
        .route("/v1/accounts/credit", post(handlers::credit_balance))
        .with_state(state)
}
