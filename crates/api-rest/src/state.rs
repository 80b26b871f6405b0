//! Shared application state handed to every request.

use crate::static_files::StaticFiles;
use pof_core::{CoreConfig, PatientRepository};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state for the REST API server.
///
/// Holds the configuration resolved at startup and the single repository instance. The
/// repository sits behind an async mutex: a handler keeps the lock across the whole
/// mutate-then-flush sequence, so snapshots are written in mutation order.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    repository: Arc<Mutex<PatientRepository>>,
    static_files: StaticFiles,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, repository: PatientRepository) -> Self {
        let static_files = StaticFiles::new(cfg.client_dir());
        Self {
            cfg,
            repository: Arc::new(Mutex::new(repository)),
            static_files,
        }
    }

    pub fn cfg(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn repository(&self) -> &Arc<Mutex<PatientRepository>> {
        &self.repository
    }

    pub fn static_files(&self) -> &StaticFiles {
        &self.static_files
    }
}
