//! Request handlers.

use super::error::ApiError;
use super::render;
use super::AppState;
use crate::history::HistoryFilter;
use crate::live::{self, viewer_stream};
use crate::metrics::ViewerGuard;
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

/// `GET /`
pub async fn index() -> Html<String> {
    Html(render::index_page())
}

/// `POST /upload`: body is one raw image.
pub async fn upload(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
    state.pipeline.ingest(body).await?;
    Ok(StatusCode::OK)
}

/// Logs viewer disconnects and releases the viewer count.
struct ViewerSession {
    _guard: ViewerGuard,
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        tracing::info!("Viewer disconnected");
    }
}

/// `GET /video_feed`: endless multipart JPEG stream.
pub async fn video_feed(State(state): State<AppState>) -> Response {
    let session = ViewerSession {
        _guard: state.metrics.viewer_guard(),
    };
    tracing::info!(
        viewers = state.metrics.active_viewers(),
        "Viewer connected"
    );

    let mut response = Response::new(Body::from_stream(viewer_stream(&state.slot, session)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(live::CONTENT_TYPE),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

/// Raw `/pre_recordings` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub page: Option<String>,
    pub date: Option<String>,
    pub hour: Option<String>,
}

fn parse_page(raw: Option<&str>) -> Result<u64, ApiError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(1),
        Some(p) => p.parse::<u64>().map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("invalid page {p:?}, expected a positive integer"),
            )
        }),
    }
}

/// `GET /pre_recordings?page=&date=&hour=`
pub async fn pre_recordings(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Html<String>, ApiError> {
    let page = parse_page(params.page.as_deref())?;
    let filter = HistoryFilter::parse(params.date.as_deref(), params.hour.as_deref())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let result = state.history.query(filter, page).await.map_err(|e| {
        tracing::error!(error = %e, "History query failed");
        if matches!(e, crate::history::HistoryError::Storage(_)) {
            state.metrics.record_storage_failure();
        }
        ApiError::from(e)
    })?;
    state.metrics.record_history_query();

    Ok(Html(render::history_page(&result)))
}

/// `GET /health`: reports whether the store is reachable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// `GET /metrics`: Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}
