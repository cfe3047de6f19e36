//! Webhook server setup.

use std::future::Future;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::core::config::ServerConfig;
use crate::{Result, ScribeError};

use super::{
    handlers::{health_handler, webhook_handler},
    types::{ApiSizeLimits, ApiState},
};

/// Build the router with the webhook mounted at `webhook_path`.
pub fn create_router(state: ApiState, webhook_path: &str, limits: ApiSizeLimits) -> Router {
    Router::new()
        .route(webhook_path, post(webhook_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(limits.max_request_body_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` from `config` and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: &ServerConfig, state: ApiState) -> Result<()> {
    let addr = config.socket_addr()?;
    let app = create_router(state, &config.webhook_path, ApiSizeLimits::from(config));

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(ScribeError::Io)?;
    tracing::info!(
        "Listening on http://{} (webhook at {})",
        listener.local_addr().map_err(ScribeError::Io)?,
        config.webhook_path
    );

    serve_with_shutdown(listener, app, shutdown_signal()).await
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(listener: tokio::net::TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ScribeError::Other(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
