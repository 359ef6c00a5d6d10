//! Frame ingestion: transcode, publish live, archive.
//!
//! ```text
//! raw bytes → codec → live slot
//!                   → archive (insert with eviction)
//! ```
//!
//! A decode failure stops the pipeline before anything is published.
//! The live slot and the archive are updated independently: when the
//! archive write fails, the slot already holds the new frame and the
//! failure is reported to the caller.

use crate::archive::{BoundedArchive, FrameRecord, StoreError};
use crate::codec::{CodecError, FrameCodec};
use crate::live::LiveFrameSlot;
use crate::metrics::MetricsRegistry;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while ingesting a frame.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("frame published live but not archived: {0}")]
    Storage(#[source] StoreError),
    #[error("transcode task failed: {0}")]
    Task(String),
}

/// Details of an accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReceipt {
    pub timestamp: DateTime<Utc>,
    pub encoded_bytes: usize,
    pub evicted: u64,
}

/// Orchestrates codec, live slot and archive for each incoming frame.
pub struct IngestPipeline {
    codec: FrameCodec,
    slot: LiveFrameSlot,
    archive: Arc<BoundedArchive>,
    timezone: Tz,
    metrics: Arc<MetricsRegistry>,
}

impl IngestPipeline {
    pub fn new(
        codec: FrameCodec,
        slot: LiveFrameSlot,
        archive: Arc<BoundedArchive>,
        timezone: Tz,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            codec,
            slot,
            archive,
            timezone,
            metrics,
        }
    }

    /// Ingests `raw`, stamped with the current time.
    pub async fn ingest(&self, raw: Bytes) -> Result<IngestReceipt, IngestError> {
        self.ingest_at(raw, Utc::now()).await
    }

    /// Ingests `raw` as if received at `now`.
    ///
    /// The same instant, truncated to milliseconds, is drawn onto the
    /// frame (as local time) and stored as the record timestamp.
    pub async fn ingest_at(
        &self,
        raw: Bytes,
        now: DateTime<Utc>,
    ) -> Result<IngestReceipt, IngestError> {
        let now = now.trunc_subsecs(3);
        let local = now.with_timezone(&self.timezone);
        let codec = self.codec.clone();
        let input_bytes = raw.len();

        let encoded = tokio::task::spawn_blocking(move || codec.encode(&raw, &local))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?
            .map_err(|e| {
                if matches!(e, CodecError::Decode(_)) {
                    self.metrics.record_decode_failure();
                }
                tracing::warn!(input_bytes, error = %e, "Rejected uploaded frame");
                e
            })?;

        self.slot.set(encoded.clone());
        self.metrics.record_ingested();

        let encoded_bytes = encoded.len();
        let outcome = self
            .archive
            .insert(FrameRecord::new(now, encoded))
            .await
            .map_err(|e| {
                self.metrics.record_storage_failure();
                tracing::error!(error = %e, "Failed to archive frame");
                IngestError::Storage(e)
            })?;
        self.metrics.record_archived(outcome.evicted, outcome.retained);

        tracing::debug!(
            input_bytes,
            encoded_bytes,
            evicted = outcome.evicted,
            retained = outcome.retained,
            "Ingested frame"
        );

        Ok(IngestReceipt {
            timestamp: now,
            encoded_bytes,
            evicted: outcome.evicted,
        })
    }

    /// Returns the live slot this pipeline publishes to.
    pub fn slot(&self) -> &LiveFrameSlot {
        &self.slot
    }
}
