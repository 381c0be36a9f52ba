//! Serving the predictor until Ctrl-C.

use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::WebError;
use crate::handle::ModelHandle;
use crate::routes::router;

/// Bind the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`WebError::Bind`] | the address cannot be bound |
/// | [`WebError::Serve`] | the server stops with an I/O error |
#[instrument(skip_all, fields(addr = %config.addr()))]
pub async fn serve(config: &ServerConfig, handle: ModelHandle) -> Result<(), WebError> {
    let listener = TcpListener::bind(config.addr())
        .await
        .map_err(|e| WebError::Bind {
            addr: config.addr(),
            source: e,
        })?;
    let local = listener.local_addr().unwrap_or(config.addr());
    info!(addr = %local, "predictor listening on http://{local}/");

    axum::serve(listener, router(handle))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WebError::Serve { source: e })?;

    info!("predictor stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "cannot listen for Ctrl-C; shutting down"),
    }
}
