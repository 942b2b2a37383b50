use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid combination: {0}")]
    InvalidCombination(String),

    #[error("Cache not ready: no draw index has been built yet")]
    CacheNotReady,

    #[error("Deadline exceeded before evaluation started")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidCombination(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CacheNotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
