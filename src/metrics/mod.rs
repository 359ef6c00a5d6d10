//! Prometheus metrics for the relay.
//!
//! # Metrics Exposed
//!
//! ## Ingestion
//! - `frame_relay_frames_ingested_total` - Frames accepted and published live
//! - `frame_relay_decode_failures_total` - Uploads rejected as undecodable
//! - `frame_relay_storage_failures_total` - Failed store operations
//!
//! ## Archive
//! - `frame_relay_frames_evicted_total` - Frames removed by the rolling window
//! - `frame_relay_archive_frames` - Archived frame count after the last insert
//! - `frame_relay_history_queries_total` - History pages served
//!
//! ## Live view
//! - `frame_relay_active_viewers` - Connected viewer streams
//!
//! The registry is served as text at `GET /metrics`.

mod collector;

pub use collector::{MetricsError, MetricsRegistry, ViewerGuard};
