use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ledger_core::PaymentId;
use tracing::{info_span, Instrument};

use crate::models::payment::Payment;
use crate::observability::{get_metrics, mask_id, LatencyTimer};

use super::requests::CreatePaymentRequest;
use super::responses::{ApiError, ApiResponse};
use super::routes::AppState;

/// `CreatePayment` (§4.6, §6.4). Wrapped in the HTTP-retry idempotency
/// guard keyed on `client_idempotency_key`, distinct from the saga's own
/// per-`Payment` key (§9).
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), ApiError> {
    req.validate().map_err(ApiError)?;
    let currency = req.currency().map_err(ApiError)?;

    let timer = LatencyTimer::new();
    let span = info_span!(
        "create_payment",
        source_account_id = %mask_id(&req.source_account_id.to_string()),
        destination_account_id = %mask_id(&req.destination_account_id.to_string())
    );

    let idempotency_key = state.idempotency.normalize_client_key(&req.client_idempotency_key);
    let request_hash = state.idempotency.hash_request(&req);

    let result = state
        .idempotency
        .execute(&idempotency_key, "create_payment", &request_hash, || {
            let orchestrator = state.orchestrator.clone();
            let source_account_id = req.source_account_id;
            let destination_account_id = req.destination_account_id;
            let amount = req.amount;
            let currency = currency.clone();
            async move {
                orchestrator
                    .create_payment(source_account_id, destination_account_id, amount, currency)
                    .await
            }
        })
        .instrument(span)
        .await;

    record_outcome("create_payment", &result, timer.elapsed_ms());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(result.map_err(ApiError)?)),
    ))
}

/// `ProcessPayment` (§4.6). Idempotent by design at the saga layer (§9),
/// so this route carries no separate idempotency guard of its own.
pub async fn process_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!("process_payment", payment_id = %mask_id(&payment_id.to_string()));

    let result = state
        .orchestrator
        .process_payment(payment_id)
        .instrument(span)
        .await;

    record_outcome("process_payment", &result, timer.elapsed_ms());
    Ok(Json(ApiResponse::success(result.map_err(ApiError)?)))
}

/// `CancelPayment` (§4.6).
pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!("cancel_payment", payment_id = %mask_id(&payment_id.to_string()));

    let result = state
        .orchestrator
        .cancel_payment(payment_id)
        .instrument(span)
        .await;

    record_outcome("cancel_payment", &result, timer.elapsed_ms());
    Ok(Json(ApiResponse::success(result.map_err(ApiError)?)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let payment = state.orchestrator.get_payment(payment_id).await.map_err(ApiError)?;
    Ok(Json(ApiResponse::success(payment)))
}

fn record_outcome<T>(operation: &str, result: &ledger_core::Result<T>, duration_ms: f64) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.code_str(),
    };
    get_metrics().record_call(operation, outcome, duration_ms);
}

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.health_checker.check_all().await;
    Json(serde_json::json!(health))
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default()
}
