//! # PatientsOnFIRE Core
//!
//! Core business logic for the PatientsOnFIRE patient server.
//!
//! This crate contains pure data operations and snapshot persistence:
//! - The patient repository (identifier allocation, CRUD, ordered listing)
//! - JSON snapshot loading and saving
//! - Startup configuration resolved once and passed down
//!
//! **No API concerns**: HTTP routing, request decoding and status mapping belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod persistence;
pub mod repositories;

pub use config::CoreConfig;
pub use constants::*;
pub use error::{PatientError, PatientResult};
pub use persistence::{JsonSnapshotFile, Snapshot};
pub use repositories::patient::PatientRepository;

pub use fhir::{Patient, PatientResource};
pub use pof_types::{IdError, PatientId};
