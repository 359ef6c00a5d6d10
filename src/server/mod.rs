//! HTTP front end.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | Live view page |
//! | `POST /upload` | Ingest one raw frame |
//! | `GET /video_feed` | Multipart JPEG live stream |
//! | `GET /pre_recordings` | Paginated history page |
//! | `GET /health` | Store reachability |
//! | `GET /metrics` | Prometheus metrics |

mod error;
mod handlers;
mod render;

pub use error::ApiError;

use crate::archive::FrameStore;
use crate::config::ServerConfig;
use crate::history::HistoryService;
use crate::ingest::IngestPipeline;
use crate::live::LiveFrameSlot;
use crate::metrics::MetricsRegistry;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub slot: LiveFrameSlot,
    pub history: HistoryService,
    pub store: Arc<dyn FrameStore>,
    pub metrics: Arc<MetricsRegistry>,
}

/// Builds the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/video_feed", get(handlers::video_feed))
        .route("/pre_recordings", get(handlers::pre_recordings))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the relay.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// On shutdown the live slot is closed so open viewer streams end and
    /// in-flight requests can drain.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.state.slot.clone();
        let app = router(self.state, self.config.max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "HTTP server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutting down, closing viewer streams");
                slot.close();
            })
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}
