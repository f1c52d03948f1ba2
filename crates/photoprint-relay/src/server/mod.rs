// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP surface of the relay.
//
//   GET  /printers           current inventory snapshot
//   GET  /printers/refresh   re-query the host, then as above
//   POST /print              base64 image -> native print path
//   GET  /health             liveness plus default printer
//   GET  /info               service metadata

mod handlers;
mod state;

pub use state::AppState;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use photoprint_core::error::{PhotoprintError, Result};

/// Build the router. `max_body_bytes` bounds the `/print` request body.
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/printers", get(handlers::printers))
        .route("/printers/refresh", get(handlers::refresh_printers))
        .route(
            "/print",
            post(handlers::print).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` for the HTTP server.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| PhotoprintError::Server(format!("failed to bind to {addr}: {e}")))
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PhotoprintError::Server(e.to_string()))
}
