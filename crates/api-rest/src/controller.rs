//! Patient operations.
//!
//! Each function runs the same pipeline: cheap input checks, structural validation, then the
//! repository call, with the outcome mapped onto a status code. Nothing here touches the
//! repository until the request has been fully validated.

use crate::error::ApiError;
use crate::http::{json_response, no_content, read_json_body};
use crate::state::AppState;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use fhir::{FhirError, Patient, PatientResource};
use pof_types::PatientId;
use serde_json::Value;

fn checked_id(raw: u64) -> Result<PatientId, ApiError> {
    PatientId::try_from(raw).map_err(|_| ApiError::BadInput("Invalid patient ID".into()))
}

fn validated_record(value: Value) -> Result<PatientResource, ApiError> {
    let report = Patient::validate_structure(&value);
    if !report.valid {
        return Err(ApiError::BadInput(format!(
            "Invalid patient data: {}",
            report.message()
        )));
    }

    Patient::normalize(value).map_err(|e| match e {
        FhirError::Schema { .. } => ApiError::BadInput(format!("Invalid patient data: {e}")),
        other => ApiError::internal(other),
    })
}

fn not_found() -> ApiError {
    ApiError::NotFound("Patient not found".into())
}

/// `POST /Patient`
///
/// Any identifier in the body is ignored; the repository assigns the next one. Responds `201`
/// with the stored record and a `Location` header naming it.
pub async fn create_patient(state: &AppState, body: Body) -> Result<Response, ApiError> {
    let value = read_json_body(body, state.cfg().max_body_bytes()).await?;
    let record = validated_record(value)?;

    let created = state
        .repository()
        .lock()
        .await
        .create(record)
        .await
        .map_err(ApiError::internal)?;
    let id = Patient::get_identifier(&created)
        .ok_or_else(|| ApiError::internal("created record has no identifier"))?;
    tracing::info!("created patient {}", id);

    let mut response = json_response(StatusCode::CREATED, &created);
    let location = HeaderValue::from_str(&format!("/Patient/{id}")).map_err(ApiError::internal)?;
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

/// `GET /Patient/{id}`
pub async fn read_patient(state: &AppState, raw_id: u64) -> Result<Response, ApiError> {
    let id = checked_id(raw_id)?;
    let repository = state.repository().lock().await;
    let record = repository.get_by_id(id).ok_or_else(not_found)?;
    Ok(json_response(StatusCode::OK, record))
}

/// `PUT /Patient/{id}`
///
/// Full replacement. When the body carries an identifier it must numerically equal the one in
/// the URL (`1.0` matches `1`); the check runs before the repository is touched so a mismatch
/// never alters stored data.
pub async fn update_patient(
    state: &AppState,
    raw_id: u64,
    body: Body,
) -> Result<Response, ApiError> {
    let id = checked_id(raw_id)?;
    let value = read_json_body(body, state.cfg().max_body_bytes()).await?;
    let record = validated_record(value)?;

    if record.identifier.is_some() && !Patient::identifier_matches(&record, id) {
        return Err(ApiError::BadInput(
            "Identifier mismatch: URL ID does not match patient identifier".into(),
        ));
    }

    let updated = state
        .repository()
        .lock()
        .await
        .update(id, record)
        .await
        .ok_or_else(not_found)?;
    tracing::info!("updated patient {}", id);

    Ok(json_response(StatusCode::OK, &updated))
}

/// `DELETE /Patient/{id}`
pub async fn delete_patient(state: &AppState, raw_id: u64) -> Result<Response, ApiError> {
    let id = checked_id(raw_id)?;
    state
        .repository()
        .lock()
        .await
        .delete(id)
        .await
        .ok_or_else(not_found)?;
    tracing::info!("deleted patient {}", id);

    Ok(no_content())
}

/// `GET /PatientIDs`
///
/// `200` with the ascending identifier list, or `204` with no body when the store is empty.
pub async fn list_patient_ids(state: &AppState) -> Result<Response, ApiError> {
    let ids = state.repository().lock().await.list_ids();
    if ids.is_empty() {
        return Ok(no_content());
    }
    Ok(json_response(StatusCode::OK, &ids))
}
