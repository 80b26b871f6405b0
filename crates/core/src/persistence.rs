//! JSON snapshot persistence for the patient repository.
//!
//! The whole repository state is written as one document on every mutation:
//!
//! ```text
//! {
//!   "patients": { "1": { "resourceType": "Patient", "identifier": 1, ... }, ... },
//!   "nextId": 2
//! }
//! ```
//!
//! Writes go to a sibling `*.tmp` file which is then renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.

use crate::error::{PatientError, PatientResult};
use fhir::PatientResource;
use pof_types::PatientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Owned snapshot as read back from disk.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub patients: BTreeMap<PatientId, PatientResource>,

    /// Zero when the document omits the counter.
    #[serde(rename = "nextId", default)]
    pub next_id: u64,
}

/// Borrowed view used for writing, so a flush never clones the store.
#[derive(Serialize)]
struct SnapshotView<'a> {
    patients: &'a BTreeMap<PatientId, PatientResource>,

    #[serde(rename = "nextId")]
    next_id: u64,
}

/// A snapshot stored as a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonSnapshotFile {
    path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if:
    /// - the file exists but cannot be read ([`PatientError::FileRead`])
    /// - the content is not a valid snapshot document ([`PatientError::Deserialization`])
    pub async fn load(&self) -> PatientResult<Option<Snapshot>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PatientError::FileRead(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(PatientError::Deserialization)
    }

    /// Replace the snapshot with the given state.
    ///
    /// `next_id` is written as a bare integer; once identifiers are exhausted it lies beyond the
    /// range a [`PatientId`] can hold.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if:
    /// - serialisation fails ([`PatientError::Serialization`])
    /// - the temp file cannot be written or renamed into place ([`PatientError::FileWrite`])
    pub async fn save(
        &self,
        patients: &BTreeMap<PatientId, PatientResource>,
        next_id: u64,
    ) -> PatientResult<()> {
        let view = SnapshotView { patients, next_id };
        let json = serde_json::to_string_pretty(&view).map_err(PatientError::Serialization)?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(PatientError::FileWrite)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(PatientError::FileWrite)?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::Patient;
    use serde_json::json;
    use tempfile::TempDir;

    fn id(raw: i64) -> PatientId {
        PatientId::new(raw).unwrap()
    }

    fn record(raw: i64) -> PatientResource {
        Patient::with_identifier(Patient::template(), id(raw))
    }

    #[tokio::test]
    async fn load_returns_none_for_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonSnapshotFile::new(temp_dir.path().join("absent.json"));

        assert!(file.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonSnapshotFile::new(temp_dir.path().join("data.json"));

        let mut patients = BTreeMap::new();
        patients.insert(id(1), record(1));
        patients.insert(id(10), record(10));

        file.save(&patients, 11).await.expect("save");
        let snapshot = file.load().await.expect("load").expect("present");

        assert_eq!(snapshot.patients, patients);
        assert_eq!(snapshot.next_id, 11);
        assert!(!temp_dir.path().join("data.json.tmp").exists());
    }

    #[tokio::test]
    async fn saved_layout_uses_string_keys_and_next_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.json");
        let file = JsonSnapshotFile::new(&path);

        let mut patients = BTreeMap::new();
        patients.insert(id(2), record(2));
        file.save(&patients, 3).await.expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            json!({
                "patients": {"2": {"resourceType": "Patient", "identifier": 2}},
                "nextId": 3
            })
        );
    }

    #[tokio::test]
    async fn load_defaults_missing_sections() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "{}").unwrap();

        let snapshot = JsonSnapshotFile::new(&path)
            .load()
            .await
            .expect("load")
            .expect("present");
        assert!(snapshot.patients.is_empty());
        assert_eq!(snapshot.next_id, 0);
    }

    #[tokio::test]
    async fn load_rejects_malformed_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonSnapshotFile::new(&path)
            .load()
            .await
            .expect_err("malformed");
        assert!(matches!(err, PatientError::Deserialization(_)));
    }

    #[tokio::test]
    async fn save_fails_when_directory_is_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonSnapshotFile::new(temp_dir.path().join("missing").join("data.json"));

        let err = file
            .save(&BTreeMap::new(), 1)
            .await
            .expect_err("no parent dir");
        assert!(matches!(err, PatientError::FileWrite(_)));
    }
}
