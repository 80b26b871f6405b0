//! Manual route table.
//!
//! The whole API is five operations plus static delivery, so routing is a single `match` over
//! method and normalised path rather than an axum route tree. This keeps the precedence rules
//! explicit: any `GET` outside `/Patient*` goes to the client directory, and a malformed ID in
//! an item path is a `400`, never a `404`.

use crate::controller;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use pof_types::PatientId;

pub const PATIENT_PATH: &str = "/Patient";
pub const PATIENT_ITEM_PREFIX: &str = "/Patient/";
pub const PATIENT_IDS_PATH: &str = "/PatientIDs";

/// The outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    CreatePatient,
    ReadPatient(PatientId),
    UpdatePatient(PatientId),
    DeletePatient(PatientId),
    ListPatientIds,
    Static(String),
    InvalidPatientId,
    NotFound,
}

/// Normalise a request path before routing.
///
/// Strips one trailing slash (the root is exempt), then the `base_path` prefix when the path
/// sits under it, and finally guarantees a single leading slash. `base_path` is expected in the
/// form produced by `pof_core::config::normalize_base_path`.
pub fn normalize_path(path: &str, base_path: &str) -> String {
    let mut path = path;
    if path.len() > 1 {
        if let Some(stripped) = path.strip_suffix('/') {
            path = stripped;
        }
    }

    if !base_path.is_empty() {
        if let Some(rest) = path.strip_prefix(base_path) {
            if rest.is_empty() || rest.starts_with('/') {
                path = rest;
            }
        }
    }

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Map a method and normalised path onto a [`Route`].
pub fn resolve(method: &Method, path: &str) -> Route {
    if *method == Method::GET && !path.starts_with(PATIENT_PATH) {
        return Route::Static(path.to_string());
    }
    if *method == Method::POST && path == PATIENT_PATH {
        return Route::CreatePatient;
    }
    if *method == Method::GET && path == PATIENT_IDS_PATH {
        return Route::ListPatientIds;
    }

    let make: fn(PatientId) -> Route = match *method {
        Method::GET => Route::ReadPatient,
        Method::PUT => Route::UpdatePatient,
        Method::DELETE => Route::DeletePatient,
        _ => return Route::NotFound,
    };
    match path.strip_prefix(PATIENT_ITEM_PREFIX) {
        Some(segment) => PatientId::parse(segment)
            .map(make)
            .unwrap_or(Route::InvalidPatientId),
        None => Route::NotFound,
    }
}

/// The single entry point for every request.
#[axum::debug_handler]
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    tracing::info!("{} {}", parts.method, parts.uri);

    let path = normalize_path(parts.uri.path(), state.cfg().base_path());
    let result = match resolve(&parts.method, &path) {
        Route::CreatePatient => controller::create_patient(&state, body).await,
        Route::ReadPatient(id) => controller::read_patient(&state, id.get()).await,
        Route::UpdatePatient(id) => controller::update_patient(&state, id.get(), body).await,
        Route::DeletePatient(id) => controller::delete_patient(&state, id.get()).await,
        Route::ListPatientIds => controller::list_patient_ids(&state).await,
        Route::Static(path) => state.static_files().serve(&path).await,
        Route::InvalidPatientId => Err(ApiError::BadInput("Invalid patient ID in URL".into())),
        Route::NotFound => Err(ApiError::NotFound(format!(
            "Route not found: {} {}",
            parts.method, path
        ))),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}
