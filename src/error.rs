//! Error codes and the HTTP error envelope.
//!
//! Every error that can reach a client implements [`ErrorCode`]; [`ApiError`]
//! turns it into `{ code, message, retryable }` with a status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Stable machine-readable code plus retry hint for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON error body returned by API handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// An error ready to be sent as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self {
            status,
            body: ErrorBody { code: err.error_code(), message: err.to_string(), retryable: err.retryable() },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("not here")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    #[test]
    fn api_error_carries_code_and_message() {
        let err = ApiError::new(StatusCode::NOT_FOUND, &NotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.code, "E_NOT_FOUND");
        assert_eq!(err.body.message, "not here");
        assert!(!err.body.retryable);
    }

    #[test]
    fn api_error_into_response_keeps_status() {
        let resp = ApiError::new(StatusCode::CONFLICT, &NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
