use crate::utils::validation::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Share link has expired")]
    Expired,

    #[error("File has already been downloaded")]
    AlreadyConsumed,

    #[error("Password required")]
    PasswordRequired,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Payload Too Large: {0}")]
    SizeLimitExceeded(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Blob download failed: {0}")]
    BlobDownloadFailed(String),

    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// Stable machine-readable kind, returned alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Expired => "expired",
            AppError::AlreadyConsumed => "already_consumed",
            AppError::PasswordRequired => "password_required",
            AppError::InvalidPassword => "invalid_password",
            AppError::SizeLimitExceeded(_) => "size_limit_exceeded",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::BlobDownloadFailed(_) => "blob_download_failed",
            AppError::PartialFailure(_) => "partial_failure",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Expired | AppError::AlreadyConsumed => StatusCode::GONE,
            AppError::PasswordRequired
            | AppError::InvalidPassword
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::SizeLimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BlobDownloadFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::PartialFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e.code {
            "FILE_TOO_LARGE" => AppError::SizeLimitExceeded(e.message),
            _ => AppError::BadRequest(e.message),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                "Service temporarily unavailable".to_string()
            }
            AppError::BlobDownloadFailed(msg) => {
                tracing::error!("Blob download failed: {}", msg);
                "Failed to retrieve file content".to_string()
            }
            AppError::PartialFailure(msg) => {
                tracing::error!("Partial failure: {}", msg);
                "Operation partially completed".to_string()
            }
            AppError::NotFound(msg)
            | AppError::SizeLimitExceeded(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
