//! FHIR-aligned wire model for the patient resource.
//!
//! This crate provides the typed patient record and the validation and normalisation helpers
//! applied to untrusted JSON before it reaches the repository.

pub mod patient;

// Re-export facades
pub use patient::Patient;

// Re-export public wire types
pub use patient::{PatientResource, ResourceKind, StructureReport};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] pof_types::IdError),

    #[error("{path}: {reason}")]
    Schema { path: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
