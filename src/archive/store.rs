//! Storage backend abstraction.
//!
//! The archive treats its backend as a generic ordered document store:
//! single-record inserts and deletes are atomic, everything else is a
//! sequence of independent calls.

use super::record::{FrameRecord, TimeRange};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Trait for frame storage backends.
///
/// Ordering is always by timestamp ascending. Record identities are
/// owned by the implementation and never cross this boundary.
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Inserts a single record.
    async fn insert(&self, record: &FrameRecord) -> Result<(), StoreError>;

    /// Counts records within `range`, or all records when `None`.
    async fn count(&self, range: Option<&TimeRange>) -> Result<u64, StoreError>;

    /// Deletes up to `n` records with the oldest timestamps.
    ///
    /// Returns the number of records actually removed.
    async fn delete_oldest(&self, n: u64) -> Result<u64, StoreError>;

    /// Returns records within `range` sorted by timestamp, skipping
    /// `offset` and returning at most `limit`.
    async fn find(
        &self,
        range: Option<&TimeRange>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FrameRecord>, StoreError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
