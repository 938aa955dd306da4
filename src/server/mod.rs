//! HTTP API for browsing and editing the shared folder.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod paths;

pub use error::ApiError;

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub root: Arc<PathBuf>,
    /// Port advertised in download URLs.
    pub port: u16,
}

impl AppState {
    pub fn new(root: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            root: Arc::new(root.into()),
            port,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let downloads = ServeDir::new(state.root.as_ref());

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/files", get(handlers::list_files))
        .route(
            "/api/file",
            get(handlers::get_file)
                .post(handlers::upload_file)
                .patch(handlers::rename_file)
                .delete(handlers::delete_file),
        )
        .route("/api/create-directory", put(handlers::create_directory))
        .nest_service("/download", downloads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let port = state.port;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!("Server is running at http://localhost:{}", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
