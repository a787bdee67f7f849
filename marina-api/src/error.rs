use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marina_core::content::ContentError;
use marina_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    /// Valid session without the admin role; the client should sign out
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("Too many booking requests, try again later")]
    RateLimited,
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::AuthorizationError(msg) => {
                let body = Json(json!({
                    "error": msg,
                    "sign_out": true,
                }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(e) => AppError::ValidationError(e.to_string()),
            CoreError::ContentError(e @ ContentError::UnknownSection(_)) => {
                AppError::NotFoundError(e.to_string())
            }
            CoreError::ContentError(e @ ContentError::UploadTooLarge(_)) => {
                AppError::PayloadTooLarge(e.to_string())
            }
            CoreError::ContentError(e) => AppError::ValidationError(e.to_string()),
            CoreError::NotFound(what) => AppError::NotFoundError(format!("Not found: {}", what)),
            e @ CoreError::InvalidTransition { .. } => AppError::ConflictError(e.to_string()),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::StorageError(msg) => AppError::InternalServerError(msg),
        }
    }
}

// ============================================================================
// Extractor rejections
// ============================================================================

/// Oversized bodies keep their 413; every other rejection is a bad request.
fn rejected(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::ValidationError(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        rejected(err.status(), format!("Invalid multipart body: {}", err.body_text()))
    }
}
