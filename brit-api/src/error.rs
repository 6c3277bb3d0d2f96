//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use brit_core::error::BritError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Missing or wrong credentials.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<BritError> for ApiError {
    fn from(err: BritError) -> Self {
        match &err {
            // Rejected exchanges get one generic answer whatever the stage.
            BritError::DecryptionFailure
            | BritError::VersionMismatch { .. }
            | BritError::MalformedMessage(_) => ApiError::bad_request("Request rejected"),
            BritError::InvalidAddress(_) => ApiError::validation(err.to_string()),
            _ => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_errors_are_generic_bad_requests() {
        let errors = [
            BritError::DecryptionFailure,
            BritError::MalformedMessage("row 3: bad date".into()),
            BritError::VersionMismatch {
                expected: 1,
                actual: "9".into(),
            },
        ];
        for err in errors {
            let api: ApiError = err.into();
            assert_eq!(api.status(), StatusCode::BAD_REQUEST);
            assert_eq!(api.message, "Request rejected");
        }
    }

    #[test]
    fn test_other_errors_are_internal() {
        let api: ApiError = BritError::EncryptionFailure("bad reply key".into()).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("reply key"));

        let api: ApiError = BritError::InvalidAddress("empty".into()).into();
        assert_eq!(api.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
