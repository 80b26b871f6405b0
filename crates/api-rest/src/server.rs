//! Application assembly and process lifecycle.

use crate::error::ApiError;
use crate::router::dispatch;
use crate::state::AppState;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

/// Build the axum application: one fallback dispatcher behind panic and CORS layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!("request handler panicked: {}", detail);
    ApiError::Unexpected("Internal server error".into()).into_response()
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run the server until `shutdown` resolves, then drain and flush.
///
/// Once the shutdown future fires, in-flight requests get the configured grace period to
/// finish. If they have not drained by then the process exits with status 1. After a clean
/// drain the repository is flushed one last time.
///
/// # Errors
///
/// Returns an error if the HTTP server fails while running.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let grace = state.cfg().shutdown_grace();
    let repository = state.repository().clone();
    let (drained_tx, drained_rx) = oneshot::channel::<()>();

    let signal = async move {
        shutdown.await;
        tracing::info!("-- Shutdown requested, draining connections");
        tokio::spawn(force_exit_after(grace, drained_rx));
    };

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(signal)
        .await?;
    let _ = drained_tx.send(());

    repository.lock().await.flush().await;
    tracing::info!("-- Server stopped");
    Ok(())
}

async fn force_exit_after(grace: Duration, drained: oneshot::Receiver<()>) {
    if tokio::time::timeout(grace, drained).await.is_err() {
        tracing::error!(
            "connections still open after {}s, forcing exit",
            grace.as_secs()
        );
        std::process::exit(1);
    }
}
