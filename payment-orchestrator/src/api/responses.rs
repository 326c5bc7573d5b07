use axum::{http::StatusCode as AxumStatusCode, response::IntoResponse, Json};
use ledger_core::error::ErrorBody;
use ledger_core::AppError;
use serde::{Deserialize, Serialize};

/// Same `{ success, data, error }` envelope as `ledger-service` (§4.3,
/// §4.6) — the two services share the wire shape even though they share
/// no HTTP code, only `ledger-core::error::ErrorBody`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn from_error(err: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }
}

pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.http_status() {
            s if s == http::StatusCode::NOT_FOUND => AxumStatusCode::NOT_FOUND,
            s if s == http::StatusCode::BAD_REQUEST => AxumStatusCode::BAD_REQUEST,
            s if s == http::StatusCode::CONFLICT => AxumStatusCode::CONFLICT,
            s if s == http::StatusCode::GATEWAY_TIMEOUT => AxumStatusCode::GATEWAY_TIMEOUT,
            _ => AxumStatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ApiResponse::<()>::from_error(&self.0))).into_response()
    }
}
