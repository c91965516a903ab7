//! Maps domain errors onto HTTP responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use md_core::error::{AppError, FieldError};
use md_core::traits::UnsupportedMedia;

/// Response wrapper for [`AppError`].
///
/// Body: `{"code": "LOW_BATTERY", "error": "...", "fields": [...]}`. Clients
/// should match on `code`; messages may be reworded.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    pub fn bad_request(field: &'static str, message: impl Into<String>) -> Self {
        ApiError(AppError::ValidationError(vec![FieldError::new(field, message)]))
    }

    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("body", rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request("body", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request("body", err.body_text())
    }
}

/// Upload failures: rejected content is the caller's problem, anything else is ours.
pub fn upload_error(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<UnsupportedMedia>() {
        Some(unsupported) => ApiError::bad_request("image", unsupported.to_string()),
        None => ApiError(AppError::Internal(err)),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self.0 {
            AppError::Internal(source) => {
                tracing::error!(error = ?source, "request failed");
                "internal service error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "code": self.0.kind(),
            "error": message,
        });
        let fields = self.0.field_errors();
        if !fields.is_empty() {
            body["fields"] = serde_json::json!(fields);
        }

        (status, Json(body)).into_response()
    }
}
