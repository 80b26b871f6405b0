//! Patient record repository.
//!
//! This module owns every stored patient record and the identifier counter. It handles:
//!
//! - Allocation of fresh, never-reused identifiers
//! - Strict replace-only updates and permanent deletes
//! - Ordered listing of identifiers
//! - Hydration from, and flushing to, an optional JSON snapshot
//!
//! ## Consistency
//!
//! Every mutation is applied to the in-memory map first and then flushed as a whole snapshot.
//! A failed flush is logged and the mutation kept: durability is best effort, the in-memory
//! state is authoritative for the lifetime of the process.
//!
//! ## Pure Data Operations
//!
//! This module contains **only** data operations. Request parsing, validation of untrusted
//! input and HTTP status mapping belong in `api-rest`.

use crate::error::{PatientError, PatientResult};
use crate::persistence::{JsonSnapshotFile, Snapshot};
use fhir::{Patient, PatientResource};
use pof_types::{IdError, PatientId};
use std::collections::BTreeMap;

/// Repository of patient records keyed by identifier.
///
/// The map is ordered, so [`list_ids`](PatientRepository::list_ids) is ascending without an
/// explicit sort.
#[derive(Debug)]
pub struct PatientRepository {
    patients: BTreeMap<PatientId, PatientResource>,
    /// `None` once every representable identifier has been issued.
    next_id: Option<PatientId>,
    persistence: Option<JsonSnapshotFile>,
}

impl PatientRepository {
    /// Creates an empty repository that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            patients: BTreeMap::new(),
            next_id: Some(PatientId::FIRST),
            persistence: None,
        }
    }

    /// Creates a repository and hydrates it from `persistence`, if given.
    ///
    /// Load failures are not fatal; see [`initialize`](PatientRepository::initialize).
    pub async fn open(persistence: Option<JsonSnapshotFile>) -> Self {
        let mut repo = Self {
            persistence,
            ..Self::in_memory()
        };
        repo.initialize().await;
        repo
    }

    /// Loads the last saved snapshot when persistence is enabled.
    ///
    /// A missing file, an unreadable file and malformed content all leave the repository empty
    /// with the counter at 1; the cause is logged. Records whose identifier disagrees with their
    /// key are dropped, and a counter that lags behind the highest key (dropped keys included)
    /// is raised past it.
    pub async fn initialize(&mut self) {
        self.patients.clear();
        self.next_id = Some(PatientId::FIRST);

        let Some(file) = self.persistence.clone() else {
            tracing::info!("repository running in memory (persistence disabled)");
            return;
        };

        match file.load().await {
            Ok(Some(snapshot)) => {
                self.restore(snapshot);
                tracing::info!(
                    "loaded {} patient(s) from {} (next id {:?})",
                    self.patients.len(),
                    file.path().display(),
                    self.next_id.map(PatientId::get)
                );
            }
            Ok(None) => {
                tracing::info!(
                    "no snapshot at {}, starting with an empty repository",
                    file.path().display()
                );
            }
            Err(e) => {
                tracing::error!(
                    "failed to load snapshot {}: {} - starting with an empty repository",
                    file.path().display(),
                    e
                );
            }
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        // Dropped entries still count: their identifiers were issued once.
        let highest = snapshot.patients.keys().next_back().copied();

        for (id, record) in snapshot.patients {
            if Patient::identifier_matches(&record, id) {
                self.patients.insert(id, record);
            } else {
                tracing::warn!(
                    "dropping snapshot entry {}: identifier {:?} does not match its key",
                    id,
                    record.identifier
                );
            }
        }

        let mut next_id = match PatientId::try_from(snapshot.next_id) {
            Ok(id) => Some(id),
            Err(IdError::NotPositive(_)) => Some(PatientId::FIRST),
            Err(_) => None,
        };
        if let Some(highest) = highest {
            if next_id.is_some_and(|next| next <= highest) {
                tracing::warn!(
                    "snapshot nextId {} is not above highest id {}, advancing counter",
                    snapshot.next_id,
                    highest
                );
                next_id = highest.checked_next();
            }
        }
        self.next_id = next_id;
    }

    /// Stores a new record under a freshly allocated identifier.
    ///
    /// The counter advances before the record is built, so an identifier is consumed even if
    /// a later step were to fail.
    ///
    /// # Arguments
    ///
    /// * `record` - Record to store; any client-supplied identifier is overwritten
    ///
    /// # Returns
    ///
    /// The stored record, carrying its new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::IdentifiersExhausted`] once `i64::MAX` has been issued. Nothing
    /// is stored in that case.
    pub async fn create(&mut self, record: PatientResource) -> PatientResult<PatientResource> {
        let id = self
            .next_id
            .ok_or(PatientError::IdentifiersExhausted(i64::MAX))?;
        self.next_id = id.checked_next();

        let record = Patient::with_identifier(record, id);
        self.patients.insert(id, record.clone());
        tracing::debug!("created patient {}", id);

        self.flush().await;
        Ok(record)
    }

    /// Returns the record stored under `id`, if any.
    pub fn get_by_id(&self, id: PatientId) -> Option<&PatientResource> {
        self.patients.get(&id)
    }

    /// Replaces the record stored under `id`.
    ///
    /// This is not an upsert: an unknown `id` returns `None` and changes nothing, including the
    /// identifier counter. The stored identifier is always `id`, whatever `record` carried.
    pub async fn update(&mut self, id: PatientId, record: PatientResource) -> Option<PatientResource> {
        let slot = self.patients.get_mut(&id)?;
        let record = Patient::with_identifier(record, id);
        *slot = record.clone();
        tracing::debug!("updated patient {}", id);

        self.flush().await;
        Some(record)
    }

    /// Removes the record stored under `id` permanently.
    ///
    /// The identifier is retired: the counter is untouched, so it is never handed out again.
    ///
    /// # Returns
    ///
    /// The record as it was just before removal, or `None` if `id` was unknown.
    pub async fn delete(&mut self, id: PatientId) -> Option<PatientResource> {
        let removed = self.patients.remove(&id)?;
        tracing::debug!("deleted patient {}", id);

        self.flush().await;
        Some(removed)
    }

    /// All stored identifiers in ascending order.
    pub fn list_ids(&self) -> Vec<PatientId> {
        self.patients.keys().copied().collect()
    }

    pub fn exists(&self, id: PatientId) -> bool {
        self.patients.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.patients.len()
    }

    /// The identifier the next `create` will use, or `None` when identifiers are exhausted.
    pub fn next_id(&self) -> Option<PatientId> {
        self.next_id
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence.is_some()
    }

    /// Writes the full state to the snapshot file, logging instead of failing.
    pub async fn flush(&self) {
        if let Err(e) = self.try_flush().await {
            tracing::error!("failed to save snapshot: {}", e);
        }
    }

    /// Writes the full state to the snapshot file.
    ///
    /// A no-op when persistence is disabled.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if the snapshot cannot be serialised or written.
    pub async fn try_flush(&self) -> PatientResult<()> {
        match &self.persistence {
            Some(file) => file.save(&self.patients, self.counter_value()).await,
            None => Ok(()),
        }
    }

    /// The counter as persisted: one past `i64::MAX` once exhausted.
    fn counter_value(&self) -> u64 {
        self.next_id.map_or(i64::MAX as u64 + 1, PatientId::get)
    }
}

impl Default for PatientRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}
