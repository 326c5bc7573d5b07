use axum::response::IntoResponse;
use ledger_core::dto::GetBalanceResponse;
use ledger_core::AppError;
use ledger_service::api::responses::{ApiError, ApiResponse};

#[tokio::test]
async fn api_response_success_serializes_envelope() {
    let response = ApiResponse::success(GetBalanceResponse {
        available: 100,
        currency: ledger_core::Currency::new("USD").unwrap(),
    });
    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"available\":100"));
}

#[tokio::test]
async fn api_error_maps_failed_precondition_to_409() {
    let err = ApiError(AppError::FailedPrecondition("insufficient funds".to_string()));
    let response = err.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn api_error_maps_not_found_to_404() {
    let err = ApiError(AppError::NotFound("account x".to_string()));
    let response = err.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_error_maps_deadline_exceeded_to_504() {
    let err = ApiError(AppError::DeadlineExceeded("ledger timeout".to_string()));
    let response = err.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);
}
