use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ledger_core::dto::{
    CommitReservationRequest, CreditBalanceRequest, CreditBalanceResponse, Empty,
    GetBalanceRequest, GetBalanceResponse, ReleaseReservationRequest, ReserveBalanceRequest,
    ReserveBalanceResponse,
};
use ledger_core::AccountId;
use tracing::{info_span, Instrument};

use crate::observability::{get_metrics, mask_id, LatencyTimer};

use super::responses::{ApiError, ApiResponse};
use super::routes::AppState;

/// `GetBalance` (§4.3, §6.1) — `account_id` is carried in the path so the
/// route reads naturally as a lookup, even though the RPC envelope and
/// status-code mapping match the other four write operations.
pub async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<ApiResponse<GetBalanceResponse>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!("get_balance", account_id = %mask_id(&account_id.to_string()));

    let result = state
        .engine
        .get_balance(account_id)
        .instrument(span)
        .await;

    record_outcome("get_balance", &result, timer.elapsed_ms());
    Ok(Json(ApiResponse::success(result.map_err(ApiError)?)))
}

pub async fn reserve_balance(
    State(state): State<AppState>,
    Json(req): Json<ReserveBalanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReserveBalanceResponse>>), ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!(
        "reserve_balance",
        account_id = %mask_id(&req.account_id.to_string())
    );

    let result = state.engine.reserve_balance(req).instrument(span).await;

    record_outcome("reserve_balance", &result, timer.elapsed_ms());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(result.map_err(ApiError)?)),
    ))
}

pub async fn commit_reservation(
    State(state): State<AppState>,
    Json(req): Json<CommitReservationRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!(
        "commit_reservation",
        reservation_id = %mask_id(&req.reservation_id.to_string())
    );

    let result = state.engine.commit_reservation(req).instrument(span).await;

    record_outcome("commit_reservation", &result, timer.elapsed_ms());
    result.map_err(ApiError)?;
    Ok(Json(ApiResponse::success(Empty {})))
}

pub async fn release_reservation(
    State(state): State<AppState>,
    Json(req): Json<ReleaseReservationRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!(
        "release_reservation",
        reservation_id = %mask_id(&req.reservation_id.to_string())
    );

    let result = state.engine.release_reservation(req).instrument(span).await;

    record_outcome("release_reservation", &result, timer.elapsed_ms());
    result.map_err(ApiError)?;
    Ok(Json(ApiResponse::success(Empty {})))
}

pub async fn credit_balance(
    State(state): State<AppState>,
    Json(req): Json<CreditBalanceRequest>,
) -> Result<Json<ApiResponse<CreditBalanceResponse>>, ApiError> {
    let timer = LatencyTimer::new();
    let span = info_span!(
        "credit_balance",
        account_id = %mask_id(&req.account_id.to_string())
    );

    let result = state.engine.credit_balance(req).instrument(span).await;

    record_outcome("credit_balance", &result, timer.elapsed_ms());
    Ok(Json(ApiResponse::success(result.map_err(ApiError)?)))
}

fn record_outcome<T>(operation: &str, result: &ledger_core::Result<T>, duration_ms: f64) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.code_str(),
    };
    get_metrics().record_rpc(operation, outcome, duration_ms);
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
