//! HTTP error mapping
//!
//! Every handler error becomes a failure envelope with a status code:
//! 400 invalid input, 403 forbidden, 404 not found, 409 needs rebalance or
//! frozen, 500 anything internal. Request bodies are read through [`ApiJson`]
//! so malformed JSON gets the same envelope.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use salon_common::api::{ApiResponse, ErrorBody};
use salon_common::Error;
use thiserror::Error;
use tracing::error;

/// Result type for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Handler error wrapping the common error type
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

/// JSON body extractor whose rejections become [`ApiError`]s
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError(Error::InvalidInput(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError(Error::Forbidden(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Frozen(_) => StatusCode::CONFLICT,
            Error::OrderKey(e) if e.needs_rebalance() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client
    ///
    /// Internal failures are logged in full and reported generically.
    fn public_message(&self) -> String {
        match &self.0 {
            Error::InvalidInput(msg) | Error::Forbidden(msg) => msg.clone(),
            Error::NotFound(what) => format!("{} not found", what),
            Error::Frozen(_) => self.0.to_string(),
            Error::OrderKey(e) if e.needs_rebalance() => e.to_string(),
            other => {
                error!("Request failed: {}", other);
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.public_message(),
            ..ErrorBody::from(&self.0)
        };
        (self.status(), Json(ApiResponse::<()>::failure(body))).into_response()
    }
}
