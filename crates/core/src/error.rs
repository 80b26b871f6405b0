#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("patient identifiers exhausted: no identifier left after {0}")]
    IdentifiersExhausted(i64),
    #[error("failed to read snapshot file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write snapshot file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize snapshot: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize snapshot: {0}")]
    Deserialization(serde_json::Error),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
