use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use pof_core::{
    CoreConfig, DEFAULT_CLIENT_DIR, DEFAULT_DATA_FILE, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_SHUTDOWN_GRACE_SECS, JsonSnapshotFile, PatientRepository,
    config::{
        byte_limit_from_env_value, duration_secs_from_env_value, flag_from_env_value,
        port_from_env_value,
    },
};

/// Main entry point for the PatientsOnFIRE server
///
/// Resolves configuration once, hydrates the repository, binds the listener and serves the
/// REST API until Ctrl+C or SIGTERM.
///
/// # Environment Variables
/// - `POF_HOST`: bind host (default: "127.0.0.1")
/// - `POF_PORT`: bind port (default: 8080)
/// - `POF_BASE_PATH`: prefix stripped from request paths before routing (default: none)
/// - `POF_ENABLE_PERSISTENCE`: write a JSON snapshot on every change (default: false)
/// - `POF_DATA_FILE`: snapshot path (default: "patients-data.json")
/// - `POF_CLIENT_DIR`: directory holding the browser client (default: "client")
/// - `POF_SHUTDOWN_GRACE_SECS`: seconds to drain before forcing exit (default: 5)
/// - `POF_MAX_BODY_BYTES`: request body limit (default: 1 MiB)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - an environment variable holds an unparseable value,
/// - the listen address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pof_run=info".parse()?)
                .add_directive("pof_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env()?);
    let repository = PatientRepository::open(cfg.data_file().map(JsonSnapshotFile::new)).await;

    let addr = cfg.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            let hint = match e.kind() {
                std::io::ErrorKind::AddrInUse => {
                    " (address already in use: stop the other process or set POF_PORT)"
                }
                std::io::ErrorKind::PermissionDenied => {
                    " (permission denied: choose a port above 1024)"
                }
                _ => "",
            };
            return Err(anyhow::Error::new(e).context(format!("failed to bind {addr}{hint}")));
        }
    };

    print_banner(&cfg);
    let state = AppState::new(cfg, repository);
    api_rest::serve(listener, state, api_rest::shutdown_signal()).await
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let host = std::env::var("POF_HOST").unwrap_or_else(|_| pof_core::DEFAULT_HOST.into());
    let port = port_from_env_value(std::env::var("POF_PORT").ok())?;
    let base_path = std::env::var("POF_BASE_PATH").unwrap_or_default();

    let persistence = flag_from_env_value(std::env::var("POF_ENABLE_PERSISTENCE").ok(), false)?;
    let data_file = persistence.then(|| {
        PathBuf::from(std::env::var("POF_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into()))
    });

    let client_dir =
        std::env::var("POF_CLIENT_DIR").unwrap_or_else(|_| DEFAULT_CLIENT_DIR.into());
    let grace = duration_secs_from_env_value(
        std::env::var("POF_SHUTDOWN_GRACE_SECS").ok(),
        Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
    )?;
    let max_body_bytes = byte_limit_from_env_value(
        std::env::var("POF_MAX_BODY_BYTES").ok(),
        DEFAULT_MAX_BODY_BYTES,
    )?;

    let cfg = CoreConfig::new(host, port, &base_path, data_file)
        .context("invalid server configuration")?
        .with_client_dir(PathBuf::from(client_dir))
        .with_shutdown_grace(grace)
        .with_max_body_bytes(max_body_bytes);
    Ok(cfg)
}

fn print_banner(cfg: &CoreConfig) {
    let base = format!("http://{}{}", cfg.bind_addr(), cfg.base_path());
    tracing::info!("++ PatientsOnFIRE listening on http://{}", cfg.bind_addr());
    tracing::info!("   POST   {}/Patient", base);
    tracing::info!("   GET    {}/Patient/{{id}}", base);
    tracing::info!("   PUT    {}/Patient/{{id}}", base);
    tracing::info!("   DELETE {}/Patient/{{id}}", base);
    tracing::info!("   GET    {}/PatientIDs", base);
    match cfg.data_file() {
        Some(path) => tracing::info!("   persistence: {}", path.display()),
        None => tracing::info!("   persistence: disabled (in-memory only)"),
    }
    tracing::info!("   client: {}", cfg.client_dir().display());
}
