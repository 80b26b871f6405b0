//! Error taxonomy for the HTTP layer.
//!
//! Every failure a request can hit ends up as one of these variants, and every variant renders
//! as `{"error": "<message>"}` with the matching status code.

use crate::http::{json_response, ErrorBody};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed JSON, wrong types, invalid or missing ID, identifier mismatch.
    #[error("{0}")]
    BadInput(String),
    /// Unknown patient, unknown route or missing static file.
    #[error("{0}")]
    NotFound(String),
    /// Static path escaping the client directory.
    #[error("{0}")]
    Forbidden(String),
    /// Anything else. The message is what the client sees; details go to the log.
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    /// Wrap an unexpected failure with the generic client-facing prefix.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Unexpected(format!("Internal server error: {err}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        }
        json_response(
            status,
            &ErrorBody {
                error: self.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(ApiError::BadInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::internal("disk on fire").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_prefixes_message() {
        assert_eq!(
            ApiError::internal("disk on fire").to_string(),
            "Internal server error: disk on fire"
        );
    }
}
