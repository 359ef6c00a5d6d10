//! In-process frame store.
//!
//! Backs `memory://` store URIs and the test suite. Contents are lost
//! when the process exits.

use super::record::{FrameRecord, TimeRange};
use super::store::{FrameStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Ordering key: timestamp first, insertion sequence breaks ties.
type Key = (DateTime<Utc>, u64);

#[derive(Default)]
struct Inner {
    frames: BTreeMap<Key, Bytes>,
    next_id: u64,
}

/// Ordered in-memory store keyed by timestamp.
#[derive(Default)]
pub struct MemoryFrameStore {
    inner: RwLock<Inner>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.frames.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns every stored timestamp in ascending order.
    pub async fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.inner
            .read()
            .await
            .frames
            .keys()
            .map(|(ts, _)| *ts)
            .collect()
    }
}

fn key_bounds(range: &TimeRange) -> std::ops::RangeInclusive<Key> {
    (range.start, 0)..=(range.end, u64::MAX)
}

#[async_trait]
impl FrameStore for MemoryFrameStore {
    async fn insert(&self, record: &FrameRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .frames
            .insert((record.timestamp(), id), record.image().clone());
        Ok(())
    }

    async fn count(&self, range: Option<&TimeRange>) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = match range {
            Some(range) if range.start > range.end => 0,
            Some(range) => inner.frames.range(key_bounds(range)).count(),
            None => inner.frames.len(),
        };
        Ok(count as u64)
    }

    async fn delete_oldest(&self, n: u64) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        while removed < n && inner.frames.pop_first().is_some() {
            removed += 1;
        }
        Ok(removed)
    }

    async fn find(
        &self,
        range: Option<&TimeRange>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FrameRecord>, StoreError> {
        let inner = self.inner.read().await;
        let to_record = |((ts, _), image): (&Key, &Bytes)| FrameRecord::new(*ts, image.clone());

        let records = match range {
            Some(range) if range.start > range.end => Vec::new(),
            Some(range) => inner
                .frames
                .range(key_bounds(range))
                .skip(offset as usize)
                .take(limit as usize)
                .map(to_record)
                .collect(),
            None => inner
                .frames
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(to_record)
                .collect(),
        };
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
