use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use discepto_core::AppError;
use serde::Serialize;
use tracing::error;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_permissions: Vec<String>,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::InvalidFormat(_)
            | AppError::BadContentLength { .. }
            | AppError::TooManyTags { .. } => StatusCode::BAD_REQUEST,
            // Client closed request.
            AppError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            AppError::Internal(cause) => {
                error!(%cause, "request failed");
                "internal error".to_owned()
            }
            other => other.to_string(),
        };

        let payload = Json(ErrorResponse {
            message,
            missing_permissions: self
                .0
                .missing_permissions()
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
