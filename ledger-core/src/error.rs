use serde::{Deserialize, Serialize};

/// Categorical domain error taxonomy shared by the Ledger and the Payment
/// Orchestrator. Every variant maps to exactly one wire status code in
/// `AppError::status_code`.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Wire status codes used by the RPC framing layer and by HTTP clients to
/// decide retry-safety. Mirrors the RPC status families named in the
/// error-handling design rather than raw HTTP codes, so both the Ledger's
/// axum handlers and the Orchestrator's reqwest client agree on one enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    AlreadyExists,
    DeadlineExceeded,
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NotFound,
            AppError::InvalidArgument(_) => StatusCode::InvalidArgument,
            AppError::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            AppError::AlreadyExists(_) => StatusCode::AlreadyExists,
            AppError::DeadlineExceeded(_) => StatusCode::DeadlineExceeded,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::Internal,
        }
    }

    pub fn http_status(&self) -> http::StatusCode {
        match self.status_code() {
            StatusCode::NotFound => http::StatusCode::NOT_FOUND,
            StatusCode::InvalidArgument => http::StatusCode::BAD_REQUEST,
            StatusCode::FailedPrecondition => http::StatusCode::CONFLICT,
            StatusCode::AlreadyExists => http::StatusCode::CONFLICT,
            StatusCode::DeadlineExceeded => http::StatusCode::GATEWAY_TIMEOUT,
            StatusCode::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::Internal => "INTERNAL",
        }
    }
}

/// Wire-level error body returned by both services' RPC envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.to_string(),
        }
    }
}

/// Reconstructs an `AppError` from a wire error body, for clients that need
/// to propagate the remote service's category rather than collapsing
/// everything to `Internal`.
impl ErrorBody {
    pub fn into_app_error(self) -> AppError {
        match self.code.as_str() {
            "NOT_FOUND" => AppError::NotFound(self.message),
            "INVALID_ARGUMENT" => AppError::InvalidArgument(self.message),
            "FAILED_PRECONDITION" => AppError::FailedPrecondition(self.message),
            "ALREADY_EXISTS" => AppError::AlreadyExists(self.message),
            "DEADLINE_EXCEEDED" => AppError::DeadlineExceeded(self.message),
            _ => AppError::Internal(anyhow::anyhow!(self.message)),
        }
    }
}
