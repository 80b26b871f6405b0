//! Response shaping and request body decoding.

use crate::error::ApiError;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use serde::Serialize;
use serde_json::Value;

/// Content type of every JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Serialise `body` as JSON with an explicit UTF-8 content type.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to serialise response body: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                r#"{"error":"Internal server error"}"#,
            )
                .into_response()
        }
    }
}

/// An empty-bodied response, for 204s.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Read the whole request body, up to `limit` bytes.
///
/// # Errors
///
/// - [`ApiError::BadInput`] if the body is larger than `limit`
/// - [`ApiError::Unexpected`] if the transport fails mid-read
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeded_length_limit(&e) {
            ApiError::BadInput(format!("Request body exceeds {limit} bytes"))
        } else {
            ApiError::internal(format!("failed to read request body: {e}"))
        }
    })
}

fn exceeded_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Decode a fully received body as JSON.
///
/// # Errors
///
/// Returns [`ApiError::BadInput`] with `Request body is empty` for a zero-length body and
/// `Invalid JSON: ...` for anything that does not parse.
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadInput("Request body is empty".into()));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::BadInput(format!("Invalid JSON: {e}")))
}

/// [`read_body`] followed by [`parse_json_body`].
pub async fn read_json_body(body: Body, limit: usize) -> Result<Value, ApiError> {
    let bytes = read_body(body, limit).await?;
    parse_json_body(&bytes)
}
