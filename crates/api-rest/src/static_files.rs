//! Delivery of the browser client from a directory on disk.

use crate::error::ApiError;
use crate::http::no_content;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const INDEX_PATH: &str = "/index.html";
const FAVICON_PATH: &str = "/favicon.ico";

/// Serves files below a fixed root directory.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve the file named by a normalised request path.
    ///
    /// `/` maps to `/index.html`. A missing `/favicon.ico` answers `204` so browsers stop
    /// asking.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Forbidden`] for paths with a `..` segment
    /// - [`ApiError::NotFound`] when the file does not exist
    /// - [`ApiError::Unexpected`] for any other read failure
    pub async fn serve(&self, path: &str) -> Result<Response, ApiError> {
        let path = if path == "/" { INDEX_PATH } else { path };
        if path.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ApiError::Forbidden("Forbidden".into()));
        }

        let file = self.root.join(path.trim_start_matches('/'));
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok((
                StatusCode::OK,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(content_type_for(&file)),
                )],
                bytes,
            )
                .into_response()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if path == FAVICON_PATH {
                    Ok(no_content())
                } else {
                    Err(ApiError::NotFound(format!("File not found: {path}")))
                }
            }
            Err(e) => {
                tracing::warn!("failed to read {}: {}", file.display(), e);
                Err(ApiError::Unexpected(format!(
                    "Error reading file: {}",
                    e.kind()
                )))
            }
        }
    }
}

/// MIME type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
