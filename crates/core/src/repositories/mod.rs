//! Repository management modules.
//!
//! The server manages a single resource type, so there is one repository.

pub mod patient;
