//! FHIR-aligned patient wire model and validation helpers.
//!
//! Responsibilities:
//! - Define the typed patient record exchanged over HTTP and stored in snapshots
//! - Check the type shape of untrusted JSON before it becomes a record
//! - Normalise records so the resource kind is always `Patient`
//! - Assign and compare the repository-issued identifier
//!
//! Notes:
//! - Only `resourceType` and `identifier` carry meaning here; every other field is
//!   pass-through data that is shape-checked and stored as received
//! - `name` entries and a client-supplied `identifier` are kept as raw JSON: their contents are
//!   never interpreted beyond the numeric identifier comparison
//! - Unknown top-level keys are preserved so records round-trip unchanged

use crate::{FhirError, FhirResult};
use pof_types::PatientId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key carrying the resource kind tag.
pub const RESOURCE_TYPE_KEY: &str = "resourceType";

/// The only resource kind this server manages.
pub const PATIENT_RESOURCE_TYPE: &str = "Patient";

// ============================================================================
// Wire types
// ============================================================================

/// Resource kind tag. A closed enum with a single member: a record of any other kind cannot be
/// represented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    #[default]
    Patient,
}

/// A patient record.
///
/// `identifier` is kept as raw JSON so that whatever a client sent can be compared against the
/// URL before being overwritten; use [`Patient::get_identifier`] to read it as a validated
/// [`PatientId`]. Stored records always carry a positive integer here.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatientResource {
    #[serde(rename = "resourceType", default)]
    pub resource_type: ResourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Name entries, stored as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(rename = "birthDate", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    /// Any other top-level keys, stored verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of [`Patient::validate_structure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl StructureReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// All violations joined into one human-readable line.
    pub fn message(&self) -> String {
        self.errors.join(", ")
    }
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
/// All methods are associated functions.
pub struct Patient;

impl Patient {
    /// The empty record: kind tag only.
    pub fn template() -> PatientResource {
        PatientResource::default()
    }

    /// Check the type shape of untrusted JSON.
    ///
    /// Every rule is evaluated and every violation reported, so a client sees all problems in
    /// one round trip. An absent `resourceType` is accepted because [`Patient::normalize`] fills
    /// it in.
    ///
    /// # Arguments
    ///
    /// * `value` - Parsed request body.
    ///
    /// # Returns
    ///
    /// A [`StructureReport`]; `valid` is true only when `errors` is empty.
    pub fn validate_structure(value: &Value) -> StructureReport {
        let Some(map) = value.as_object() else {
            return StructureReport::from_errors(vec!["Patient must be an object".into()]);
        };

        let mut errors = Vec::new();

        if let Some(kind) = map.get(RESOURCE_TYPE_KEY) {
            if kind.as_str() != Some(PATIENT_RESOURCE_TYPE) {
                errors.push(r#"resourceType must be "Patient""#.into());
            }
        }
        if map.get("active").is_some_and(|v| !v.is_boolean()) {
            errors.push("active must be a boolean".into());
        }
        if map.get("gender").is_some_and(|v| !v.is_string()) {
            errors.push("gender must be a string".into());
        }
        if map.get("birthDate").is_some_and(|v| !v.is_string()) {
            errors.push("birthDate must be a string".into());
        }
        if map.get("name").is_some_and(|v| !v.is_array()) {
            errors.push("name must be an array".into());
        }

        StructureReport::from_errors(errors)
    }

    /// Normalise untrusted JSON into a typed record.
    ///
    /// Non-object input yields [`Patient::template`]. For objects the kind tag is forced to
    /// `Patient` and the result decoded, surfacing the path of the failing field (for example
    /// `gender`) when a value has the wrong type. Input that passed
    /// [`Patient::validate_structure`] always decodes.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Schema`] if a field cannot be decoded into the record.
    pub fn normalize(value: Value) -> FhirResult<PatientResource> {
        let Value::Object(mut map) = value else {
            return Ok(Self::template());
        };
        map.insert(
            RESOURCE_TYPE_KEY.to_string(),
            Value::String(PATIENT_RESOURCE_TYPE.to_string()),
        );

        serde_path_to_error::deserialize::<_, PatientResource>(Value::Object(map)).map_err(
            |err| {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                FhirError::Schema {
                    path,
                    reason: err.into_inner().to_string(),
                }
            },
        )
    }

    /// Set the identifier from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidIdentifier`] if `id` is zero or negative.
    pub fn assign_identifier(record: PatientResource, id: i64) -> FhirResult<PatientResource> {
        let id = PatientId::new(id)?;
        Ok(Self::with_identifier(record, id))
    }

    /// Set the identifier from an already validated [`PatientId`].
    pub fn with_identifier(mut record: PatientResource, id: PatientId) -> PatientResource {
        record.resource_type = ResourceKind::Patient;
        record.identifier = Some(Value::from(id.as_i64()));
        record
    }

    /// The record's identifier, if it holds a positive integral number.
    ///
    /// `3` and `3.0` both read as 3. Zero, negatives, fractions and non-numbers read as absent.
    pub fn get_identifier(record: &PatientResource) -> Option<PatientId> {
        match record.identifier.as_ref()? {
            Value::Number(n) => numeric_identifier(n),
            _ => None,
        }
    }

    /// Whether the record's identifier numerically equals `id`. False when the record has none.
    pub fn identifier_matches(record: &PatientResource, id: PatientId) -> bool {
        Self::get_identifier(record) == Some(id)
    }
}

fn numeric_identifier(n: &serde_json::Number) -> Option<PatientId> {
    if let Some(raw) = n.as_i64() {
        return PatientId::new(raw).ok();
    }
    if let Some(raw) = n.as_u64() {
        return PatientId::try_from(raw).ok();
    }
    let raw = n.as_f64()?;
    if raw.fract() == 0.0 && raw >= 1.0 && raw < i64::MAX as f64 {
        PatientId::new(raw as i64).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: i64) -> PatientId {
        PatientId::new(raw).expect("valid id")
    }

    #[test]
    fn accepts_minimal_patient() {
        let report = Patient::validate_structure(&json!({"resourceType": "Patient"}));
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn tolerates_missing_resource_type() {
        let report = Patient::validate_structure(&json!({"active": true}));
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn rejects_non_object_input() {
        for input in [json!(null), json!([]), json!("Patient"), json!(3)] {
            let report = Patient::validate_structure(&input);
            assert!(!report.valid);
            assert_eq!(report.errors, vec!["Patient must be an object".to_string()]);
        }
    }

    #[test]
    fn reports_every_violation() {
        let report = Patient::validate_structure(&json!({
            "resourceType": "Observation",
            "active": "yes",
            "gender": 1,
            "birthDate": false,
            "name": "Smith"
        }));

        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                r#"resourceType must be "Patient""#.to_string(),
                "active must be a boolean".to_string(),
                "gender must be a string".to_string(),
                "birthDate must be a string".to_string(),
                "name must be an array".to_string(),
            ]
        );
        assert!(report.message().starts_with("resourceType must be"));
        assert!(report.message().contains(", active must be a boolean"));
    }

    #[test]
    fn null_is_not_a_boolean() {
        let report = Patient::validate_structure(&json!({"active": null}));
        assert_eq!(report.errors, vec!["active must be a boolean".to_string()]);
    }

    #[test]
    fn normalize_forces_kind_and_keeps_fields() {
        let record = Patient::normalize(json!({
            "active": true,
            "gender": "female",
            "birthDate": "1992-03-20",
            "name": [{"family": "Williams", "given": ["Sarah", "Jane"], "use": "official"}],
            "telecom": [{"system": "phone", "value": "555"}]
        }))
        .expect("normalize");

        assert_eq!(record.resource_type, ResourceKind::Patient);
        assert_eq!(record.active, Some(true));
        assert_eq!(record.gender.as_deref(), Some("female"));
        assert_eq!(record.birth_date.as_deref(), Some("1992-03-20"));

        let names = record.name.as_ref().expect("names");
        assert_eq!(names[0]["family"], json!("Williams"));
        assert_eq!(names[0]["given"], json!(["Sarah", "Jane"]));
        assert_eq!(names[0]["use"], json!("official"));
        assert!(record.extra.contains_key("telecom"));
    }

    #[test]
    fn normalize_returns_template_for_non_objects() {
        assert_eq!(Patient::normalize(json!(null)).unwrap(), Patient::template());
        assert_eq!(Patient::normalize(json!([1, 2])).unwrap(), Patient::template());
    }

    #[test]
    fn normalize_passes_name_entries_through() {
        let input = json!({
            "resourceType": "Patient",
            "name": ["Ann Smith", 42, {"given": "Ann"}, {"family": ["not", "a", "string"]}]
        });
        let record = Patient::normalize(input.clone()).expect("opaque name entries");
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }

    #[test]
    fn normalize_keeps_any_client_identifier() {
        for raw in [json!("abc"), json!(1.5), json!({"system": "x"}), json!(-4)] {
            let record = Patient::normalize(json!({"identifier": raw.clone()})).expect("kept");
            assert_eq!(record.identifier, Some(raw));
            assert_eq!(Patient::get_identifier(&record), None);
        }
    }

    #[test]
    fn normalize_reports_the_failing_field() {
        let err = Patient::normalize(json!({"gender": 3})).expect_err("unchecked input");
        match err {
            FhirError::Schema { path, reason } => {
                assert_eq!(path, "gender");
                assert!(reason.contains("invalid type"), "{reason}");
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn validated_input_always_normalizes() {
        let input = json!({
            "identifier": "abc",
            "active": true,
            "name": [{"given": "Ann"}, "Ann Smith"],
            "gender": "female",
            "birthDate": "not a date"
        });
        assert!(Patient::validate_structure(&input).valid);
        Patient::normalize(input).expect("normalize");
    }

    #[test]
    fn template_serialises_to_kind_only() {
        let value = serde_json::to_value(Patient::template()).unwrap();
        assert_eq!(value, json!({"resourceType": "Patient"}));
    }

    #[test]
    fn record_round_trips_through_json() {
        let input = json!({
            "resourceType": "Patient",
            "identifier": 3,
            "active": false,
            "name": [{"family": "Smith", "given": []}],
            "extension": {"anything": [1, 2, 3]}
        });
        let record = Patient::normalize(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }

    #[test]
    fn assign_identifier_sets_positive_ids() {
        let record = Patient::assign_identifier(Patient::template(), 7).unwrap();
        assert_eq!(record.identifier, Some(json!(7)));
        assert_eq!(Patient::get_identifier(&record), Some(id(7)));
    }

    #[test]
    fn assign_identifier_rejects_non_positive_ids() {
        for raw in [0, -1, i64::MIN] {
            let err = Patient::assign_identifier(Patient::template(), raw).expect_err("invalid");
            assert!(matches!(err, FhirError::InvalidIdentifier(_)));
        }
    }

    #[test]
    fn assign_identifier_overwrites_client_value() {
        let record = Patient::normalize(json!({"identifier": 99})).unwrap();
        let record = Patient::assign_identifier(record, 4).unwrap();
        assert_eq!(record.identifier, Some(json!(4)));
    }

    #[test]
    fn zero_and_negative_identifiers_read_as_absent() {
        let mut record = Patient::template();
        assert_eq!(Patient::get_identifier(&record), None);
        record.identifier = Some(json!(0));
        assert_eq!(Patient::get_identifier(&record), None);
        record.identifier = Some(json!(-5));
        assert_eq!(Patient::get_identifier(&record), None);
        record.identifier = Some(json!(0.0));
        assert_eq!(Patient::get_identifier(&record), None);
    }

    #[test]
    fn identifier_matches_compares_numerically() {
        let record = Patient::normalize(json!({"identifier": 2})).unwrap();
        assert!(Patient::identifier_matches(&record, id(2)));
        assert!(!Patient::identifier_matches(&record, id(1)));
        assert!(!Patient::identifier_matches(&Patient::template(), id(1)));

        let whole_float = Patient::normalize(json!({"identifier": 2.0})).unwrap();
        assert!(Patient::identifier_matches(&whole_float, id(2)));

        for raw in [json!("2"), json!(2.5), json!(true)] {
            let record = Patient::normalize(json!({"identifier": raw})).unwrap();
            assert!(!Patient::identifier_matches(&record, id(2)));
        }
    }
}
