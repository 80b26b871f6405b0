//! Constants used throughout the PatientsOnFIRE core crate.
//!
//! Defaults for every startup setting live here so the binaries, the CLI and the tests agree
//! on them.

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default snapshot file used when persistence is enabled.
pub const DEFAULT_DATA_FILE: &str = "patients-data.json";

/// Default directory the static-file server delivers the browser client from.
pub const DEFAULT_CLIENT_DIR: &str = "client";

/// Seconds to wait for in-flight requests after a shutdown signal before forcing exit.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Largest request body the controller will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

