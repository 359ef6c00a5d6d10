//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the relay.
pub struct MetricsRegistry {
    registry: Registry,

    // Ingestion metrics
    frames_ingested: IntCounter,
    decode_failures: IntCounter,
    storage_failures: IntCounter,

    // Archive metrics
    frames_evicted: IntCounter,
    archive_frames: IntGauge,
    history_queries: IntCounter,

    // Live view metrics
    active_viewers: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all relay metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_ingested = IntCounter::new(
            "frame_relay_frames_ingested_total",
            "Frames accepted and published to the live slot",
        )?;
        let decode_failures = IntCounter::new(
            "frame_relay_decode_failures_total",
            "Uploads rejected because the image could not be decoded",
        )?;
        let storage_failures = IntCounter::new(
            "frame_relay_storage_failures_total",
            "Store operations that failed",
        )?;

        let frames_evicted = IntCounter::new(
            "frame_relay_frames_evicted_total",
            "Frames evicted from the archive by the rolling window",
        )?;
        let archive_frames = IntGauge::new(
            "frame_relay_archive_frames",
            "Archived frame count as of the last insert",
        )?;
        let history_queries = IntCounter::new(
            "frame_relay_history_queries_total",
            "History pages served",
        )?;

        let active_viewers = IntGauge::new(
            "frame_relay_active_viewers",
            "Viewer streams currently connected",
        )?;

        registry.register(Box::new(frames_ingested.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(storage_failures.clone()))?;
        registry.register(Box::new(frames_evicted.clone()))?;
        registry.register(Box::new(archive_frames.clone()))?;
        registry.register(Box::new(history_queries.clone()))?;
        registry.register(Box::new(active_viewers.clone()))?;

        Ok(Self {
            registry,
            frames_ingested,
            decode_failures,
            storage_failures,
            frames_evicted,
            archive_frames,
            history_queries,
            active_viewers,
        })
    }

    pub fn record_ingested(&self) {
        self.frames_ingested.inc();
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.inc();
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.inc();
    }

    /// Records the outcome of an archive insert.
    pub fn record_archived(&self, evicted: u64, retained: u64) {
        self.frames_evicted.inc_by(evicted);
        self.archive_frames.set(retained as i64);
    }

    pub fn record_history_query(&self) {
        self.history_queries.inc();
    }

    /// Counts a connected viewer until the returned guard is dropped.
    pub fn viewer_guard(&self) -> ViewerGuard {
        self.active_viewers.inc();
        ViewerGuard {
            gauge: self.active_viewers.clone(),
        }
    }

    /// Returns the current number of connected viewers.
    pub fn active_viewers(&self) -> i64 {
        self.active_viewers.get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Decrements the active viewer gauge on drop.
pub struct ViewerGuard {
    gauge: IntGauge,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_archive_metrics() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_ingested();
        registry.record_archived(2, 5000);
        registry.record_archived(1, 5000);

        let output = registry.encode().unwrap();
        assert!(output.contains("frame_relay_frames_ingested_total 1"));
        assert!(output.contains("frame_relay_frames_evicted_total 3"));
        assert!(output.contains("frame_relay_archive_frames 5000"));
    }

    #[test]
    fn test_viewer_guard_tracks_connections() {
        let registry = MetricsRegistry::new().unwrap();
        let first = registry.viewer_guard();
        let second = registry.viewer_guard();
        assert_eq!(registry.active_viewers(), 2);

        drop(first);
        assert_eq!(registry.active_viewers(), 1);
        drop(second);
        assert_eq!(registry.active_viewers(), 0);
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("frame_relay_decode_failures_total"));
        assert!(output.contains("frame_relay_storage_failures_total"));
        assert!(output.contains("frame_relay_active_viewers"));
    }
}
