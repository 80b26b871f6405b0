//! # API REST
//!
//! REST API implementation for PatientsOnFIRE.
//!
//! Handles:
//! - Path normalisation and the manual route table (`router`)
//! - One controller function per patient operation (`controller`)
//! - JSON response shaping and request body decoding (`http`)
//! - Delivery of the browser client (`static_files`)
//! - Application assembly and graceful shutdown (`server`)
//!
//! Uses `pof-core` for the repository and configuration and `fhir` for the resource model.

#![warn(rust_2018_idioms)]

pub mod controller;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
pub mod state;
pub mod static_files;

pub use error::ApiError;
pub use router::{dispatch, normalize_path, resolve, Route};
pub use server::{build_app, serve, shutdown_signal};
pub use state::AppState;
pub use static_files::StaticFiles;
