//! Capacity-limited archive with rolling eviction.
//!
//! Every insert first counts the stored records. If the count is at or
//! above capacity, the `count - capacity + 1` oldest records (by
//! timestamp) are deleted so the new record fits. The count and the
//! delete are separate store calls: concurrent inserts can both see the
//! same pre-insert count and momentarily leave the archive above
//! capacity. The next insert corrects it. Set `strict_capacity` to
//! serialize the whole sequence instead.

use super::record::{FrameRecord, TimeRange};
use super::store::{FrameStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Configuration for the bounded archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Maximum number of retained frames.
    pub max_frames: u64,
    /// Serialize count, evict and insert behind a per-archive lock.
    pub strict_capacity: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_frames: 5000,
            strict_capacity: false,
        }
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Records evicted to make room.
    pub evicted: u64,
    /// Record count after the insert, as seen by this call.
    pub retained: u64,
}

/// Ordered, capacity-limited frame archive over a [`FrameStore`].
pub struct BoundedArchive {
    store: Arc<dyn FrameStore>,
    max_frames: u64,
    insert_lock: Option<Mutex<()>>,
}

impl BoundedArchive {
    /// Creates an archive over `store`.
    ///
    /// A zero capacity is raised to one.
    pub fn new(store: Arc<dyn FrameStore>, config: &ArchiveConfig) -> Self {
        Self {
            store,
            max_frames: config.max_frames.max(1),
            insert_lock: config.strict_capacity.then(|| Mutex::new(())),
        }
    }

    /// Returns the capacity.
    #[inline]
    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }

    /// Inserts a record, evicting the oldest records first if the archive
    /// is at capacity.
    pub async fn insert(&self, record: FrameRecord) -> Result<InsertOutcome, StoreError> {
        let _guard = match &self.insert_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let total = self.store.count(None).await?;
        let mut evicted = 0;
        if total >= self.max_frames {
            let excess = total - self.max_frames + 1;
            evicted = self.store.delete_oldest(excess).await?;
            tracing::debug!(
                total,
                requested = excess,
                evicted,
                max_frames = self.max_frames,
                "Evicted oldest frames"
            );
        }

        self.store.insert(&record).await?;

        let retained = total.saturating_sub(evicted) + 1;
        tracing::trace!(
            timestamp = %record.timestamp(),
            bytes = record.image().len(),
            retained,
            "Archived frame"
        );

        Ok(InsertOutcome { evicted, retained })
    }

    /// Counts records within `range`, or all records when `None`.
    pub async fn count_matching(&self, range: Option<&TimeRange>) -> Result<u64, StoreError> {
        self.store.count(range).await
    }

    /// Returns one ascending page of records within `range`.
    pub async fn query_page(
        &self,
        range: Option<&TimeRange>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FrameRecord>, StoreError> {
        self.store.find(range, offset, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryFrameStore;
    use bytes::Bytes;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn t(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n)
    }

    fn record(n: i64) -> FrameRecord {
        FrameRecord::new(t(n), Bytes::from(n.to_le_bytes().to_vec()))
    }

    fn archive_with(capacity: u64) -> (Arc<MemoryFrameStore>, BoundedArchive) {
        let store = Arc::new(MemoryFrameStore::new());
        let config = ArchiveConfig {
            max_frames: capacity,
            ..Default::default()
        };
        let archive = BoundedArchive::new(store.clone(), &config);
        (store, archive)
    }

    #[tokio::test]
    async fn test_fourth_insert_evicts_oldest() {
        let (store, archive) = archive_with(3);
        for n in 1..=4 {
            archive.insert(record(n)).await.unwrap();
        }
        assert_eq!(store.timestamps().await, vec![t(2), t(3), t(4)]);
    }

    #[tokio::test]
    async fn test_insert_at_capacity_reports_eviction() {
        let (_store, archive) = archive_with(2);
        let first = archive.insert(record(1)).await.unwrap();
        assert_eq!(first, InsertOutcome { evicted: 0, retained: 1 });

        archive.insert(record(2)).await.unwrap();
        let third = archive.insert(record(3)).await.unwrap();
        assert_eq!(third, InsertOutcome { evicted: 1, retained: 2 });
    }

    #[tokio::test]
    async fn test_overshoot_corrected_on_next_insert() {
        let (store, archive) = archive_with(3);
        // Simulate a racing writer that bypassed eviction.
        for n in 1..=5 {
            store.insert(&record(n)).await.unwrap();
        }

        let outcome = archive.insert(record(6)).await.unwrap();
        assert_eq!(outcome.evicted, 3);
        assert_eq!(store.timestamps().await, vec![t(4), t(5), t(6)]);
    }

    #[tokio::test]
    async fn test_eviction_by_timestamp_not_insertion_order() {
        let (store, archive) = archive_with(2);
        archive.insert(record(10)).await.unwrap();
        archive.insert(record(20)).await.unwrap();
        // Late frame: t=10 is evicted before t=5 is written.
        archive.insert(record(5)).await.unwrap();
        assert_eq!(store.timestamps().await, vec![t(5), t(20)]);
    }

    #[tokio::test]
    async fn test_zero_capacity_raised_to_one() {
        let (store, archive) = archive_with(0);
        assert_eq!(archive.max_frames(), 1);
        archive.insert(record(1)).await.unwrap();
        archive.insert(record(2)).await.unwrap();
        assert_eq!(store.timestamps().await, vec![t(2)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_strict_capacity_under_concurrency() {
        let store = Arc::new(MemoryFrameStore::new());
        let config = ArchiveConfig {
            max_frames: 5,
            strict_capacity: true,
        };
        let archive = Arc::new(BoundedArchive::new(store.clone(), &config));

        let tasks: Vec<_> = (0..40)
            .map(|n| {
                let archive = Arc::clone(&archive);
                tokio::spawn(async move { archive.insert(record(n)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 5);
    }

    proptest! {
        #[test]
        fn prop_retains_most_recent_within_capacity(
            capacity in 1u64..8,
            inserts in 0i64..30,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let (store, archive) = archive_with(capacity);
                for n in 0..inserts {
                    archive.insert(record(n)).await.unwrap();

                    let kept = store.timestamps().await;
                    prop_assert!(kept.len() as u64 <= capacity);

                    let first = (n + 1 - capacity as i64).max(0);
                    let expected: Vec<_> = (first..=n).map(t).collect();
                    prop_assert_eq!(kept, expected);
                }
                Ok(())
            })?;
        }
    }
}
