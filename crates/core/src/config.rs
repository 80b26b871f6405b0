//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the repository and the HTTP layer. The intent is to avoid reading process-wide
//! environment variables during request handling, which can lead to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_CLIENT_DIR, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT,
    DEFAULT_SHUTDOWN_GRACE_SECS,
};
use crate::{PatientError, PatientResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    host: String,
    port: u16,
    base_path: String,
    data_file: Option<PathBuf>,
    client_dir: PathBuf,
    shutdown_grace: Duration,
    max_body_bytes: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_file` is `Some` when persistence is enabled. `base_path` is normalised to either
    /// the empty string or `/segment[/segment..]` without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if the host is blank or the data file path is empty.
    pub fn new(
        host: String,
        port: u16,
        base_path: &str,
        data_file: Option<PathBuf>,
    ) -> PatientResult<Self> {
        if host.trim().is_empty() {
            return Err(PatientError::InvalidInput("host cannot be empty".into()));
        }
        if data_file
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(PatientError::InvalidInput(
                "data file path cannot be empty when persistence is enabled".into(),
            ));
        }

        Ok(Self {
            host: host.trim().to_string(),
            port,
            base_path: normalize_base_path(base_path),
            data_file,
            client_dir: PathBuf::from(DEFAULT_CLIENT_DIR),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_client_dir(mut self, client_dir: PathBuf) -> Self {
        self.client_dir = client_dir;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn persistence_enabled(&self) -> bool {
        self.data_file.is_some()
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub fn client_dir(&self) -> &Path {
        &self.client_dir
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_path: String::new(),
            data_file: None,
            client_dir: PathBuf::from(DEFAULT_CLIENT_DIR),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Normalise an API base path.
///
/// Blank input means "no base path". Otherwise the result has exactly one leading slash and no
/// trailing slash, so `api/`, `/api` and `/api/` all become `/api`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Parse the bind port from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PORT`].
pub fn port_from_env_value(value: Option<String>) -> PatientResult<u16> {
    match non_blank(value) {
        None => Ok(DEFAULT_PORT),
        Some(v) => match v.parse::<u16>() {
            Ok(0) | Err(_) => Err(PatientError::InvalidInput(format!(
                "port must be an integer between 1 and 65535, got '{v}'"
            ))),
            Ok(port) => Ok(port),
        },
    }
}

/// Parse a boolean flag from an optional string value.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off` (case-insensitive). `None` or blank
/// input returns `default`.
pub fn flag_from_env_value(value: Option<String>, default: bool) -> PatientResult<bool> {
    let Some(v) = non_blank(value) else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(PatientError::InvalidInput(format!(
            "expected a boolean flag, got '{v}'"
        ))),
    }
}

/// Parse a whole number of seconds from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn duration_secs_from_env_value(
    value: Option<String>,
    default: Duration,
) -> PatientResult<Duration> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| PatientError::InvalidInput(format!("expected seconds, got '{v}'"))),
    }
}

/// Parse a byte count from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn byte_limit_from_env_value(value: Option<String>, default: usize) -> PatientResult<usize> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => match v.parse::<usize>() {
            Ok(0) | Err(_) => Err(PatientError::InvalidInput(format!(
                "expected a positive byte count, got '{v}'"
            ))),
            Ok(limit) => Ok(limit),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_normalised() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("  "), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/api/"), "/api");
        assert_eq!(normalize_base_path("/fhir/r4"), "/fhir/r4");
    }

    #[test]
    fn new_rejects_blank_host() {
        let err = CoreConfig::new("  ".into(), 8080, "", None).expect_err("blank host");
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn new_rejects_empty_data_file() {
        let err = CoreConfig::new("127.0.0.1".into(), 8080, "", Some(PathBuf::new()))
            .expect_err("empty data file");
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn new_tracks_persistence_and_bind_addr() {
        let cfg = CoreConfig::new(
            "0.0.0.0".into(),
            9000,
            "/api/",
            Some(PathBuf::from("data.json")),
        )
        .expect("valid config");

        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.base_path(), "/api");
        assert!(cfg.persistence_enabled());
        assert_eq!(cfg.data_file(), Some(Path::new("data.json")));
    }

    #[test]
    fn default_matches_constants() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.host(), DEFAULT_HOST);
        assert_eq!(cfg.port(), DEFAULT_PORT);
        assert!(!cfg.persistence_enabled());
        assert_eq!(cfg.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn port_parsing() {
        assert_eq!(port_from_env_value(None).unwrap(), DEFAULT_PORT);
        assert_eq!(port_from_env_value(Some(" 3000 ".into())).unwrap(), 3000);
        assert!(port_from_env_value(Some("0".into())).is_err());
        assert!(port_from_env_value(Some("70000".into())).is_err());
        assert!(port_from_env_value(Some("http".into())).is_err());
    }

    #[test]
    fn flag_parsing() {
        assert!(!flag_from_env_value(None, false).unwrap());
        assert!(flag_from_env_value(Some("".into()), true).unwrap());
        for truthy in ["true", "TRUE", "1", "yes", "On"] {
            assert!(flag_from_env_value(Some(truthy.into()), false).unwrap());
        }
        for falsy in ["false", "0", "no", "OFF"] {
            assert!(!flag_from_env_value(Some(falsy.into()), true).unwrap());
        }
        assert!(flag_from_env_value(Some("maybe".into()), false).is_err());
    }

    #[test]
    fn duration_and_limit_parsing() {
        let default = Duration::from_secs(5);
        assert_eq!(duration_secs_from_env_value(None, default).unwrap(), default);
        assert_eq!(
            duration_secs_from_env_value(Some("12".into()), default).unwrap(),
            Duration::from_secs(12)
        );
        assert!(duration_secs_from_env_value(Some("1.5".into()), default).is_err());

        assert_eq!(byte_limit_from_env_value(None, 10).unwrap(), 10);
        assert_eq!(byte_limit_from_env_value(Some("2048".into()), 10).unwrap(), 2048);
        assert!(byte_limit_from_env_value(Some("0".into()), 10).is_err());
    }
}
