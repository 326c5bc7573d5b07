use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use super::handlers;
use crate::idempotency::IdempotencyHandler;
use crate::observability::HealthChecker;
use crate::saga::PaymentOrchestrator;

/// Application state shared across handlers (§4.6, §6.4), narrowed to the
/// Orchestrator's three dependencies (Postgres, Redis, Kafka) plus the
/// saga itself and the HTTP-retry idempotency guard in front of it.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub idempotency: Arc<IdempotencyHandler>,
    pub health_checker: Arc<HealthChecker>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<PaymentOrchestrator>,
        idempotency: Arc<IdempotencyHandler>,
        health_checker: Arc<HealthChecker>,
    ) -> Self {
        Self {
            orchestrator,
            idempotency,
            health_checker,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the `PaymentOrchestrator` router (§4.6): the three saga entry
/// points plus the same ambient health/readiness/liveness/metrics
/// endpoints as `ledger-service`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/v1/payments", post(handlers::create_payment))
        .route("/v1/payments/:payment_id/process", post(handlers::process_payment))
        .route("/v1/payments/:payment_id/cancel", post(handlers::cancel_payment))
        .route("/v1/payments/:payment_id", get(handlers::get_payment))
        .with_state(state)
}
