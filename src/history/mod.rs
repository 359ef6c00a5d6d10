//! Paginated, date-grouped browsing of archived frames.
//!
//! A query resolves its date/hour filter to a time range in the
//! deployment timezone, counts the matching records for pagination,
//! fetches one ascending page and groups it by local calendar date.
//! Rendering is left to the caller.

mod filter;

pub use filter::{FilterError, HistoryFilter};

use crate::archive::{BoundedArchive, StoreError};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Records per history page.
pub const PAGE_SIZE: u64 = 20;

/// Errors that can occur while answering a history query.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// One archived frame, timestamped in the display timezone.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Tz>,
    pub image: Bytes,
}

/// One page of history, grouped by local calendar date.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Entries per date, ascending within and across dates.
    pub groups: BTreeMap<NaiveDate, Vec<HistoryEntry>>,
    /// Current page, 1-indexed.
    pub page: u64,
    /// Total pages, at least 1.
    pub total_pages: u64,
    /// Records matching the filter across all pages.
    pub total_frames: u64,
    /// Filter the page was computed for.
    pub filter: HistoryFilter,
}

impl HistoryPage {
    /// Returns the number of entries on this page.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates every entry in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.groups.values().flatten()
    }
}

/// Returns `max(1, ceil(total / PAGE_SIZE))`.
pub fn total_pages(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Answers history queries against the archive.
#[derive(Clone)]
pub struct HistoryService {
    archive: Arc<BoundedArchive>,
    timezone: Tz,
}

impl HistoryService {
    pub fn new(archive: Arc<BoundedArchive>, timezone: Tz) -> Self {
        Self { archive, timezone }
    }

    /// Returns page `page` (1-indexed, 0 treated as 1) of frames matching
    /// `filter`.
    pub async fn query(
        &self,
        filter: HistoryFilter,
        page: u64,
    ) -> Result<HistoryPage, HistoryError> {
        let page = page.max(1);
        let range = filter.time_range(&self.timezone)?;

        let total_frames = self.archive.count_matching(range.as_ref()).await?;
        let offset = (page - 1).saturating_mul(PAGE_SIZE);
        let records = if offset < total_frames {
            self.archive
                .query_page(range.as_ref(), offset, PAGE_SIZE)
                .await?
        } else {
            Vec::new()
        };

        let mut groups: BTreeMap<NaiveDate, Vec<HistoryEntry>> = BTreeMap::new();
        for record in records {
            let timestamp = record.timestamp().with_timezone(&self.timezone);
            groups
                .entry(timestamp.date_naive())
                .or_default()
                .push(HistoryEntry {
                    timestamp,
                    image: record.image().clone(),
                });
        }

        tracing::debug!(
            page,
            total_frames,
            date = ?filter.date,
            hour = ?filter.hour,
            "Served history page"
        );

        Ok(HistoryPage {
            groups,
            page,
            total_pages: total_pages(total_frames),
            total_frames,
            filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveConfig, FrameRecord, FrameStore, MemoryFrameStore, TimeRange};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Timelike, Utc};
    use chrono_tz::Asia::Kolkata;

    async fn service_with(local_times: &[DateTime<Tz>]) -> HistoryService {
        let store = Arc::new(MemoryFrameStore::new());
        for ts in local_times {
            let record = FrameRecord::new(ts.with_timezone(&Utc), Bytes::from_static(b"jpeg"));
            store.insert(&record).await.unwrap();
        }
        let archive = Arc::new(BoundedArchive::new(store, &ArchiveConfig::default()));
        HistoryService::new(archive, Kolkata)
    }

    fn local(d: u32, h: u32, m: u32) -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(20), 1);
        assert_eq!(total_pages(21), 2);
        assert_eq!(total_pages(45), 3);
    }

    #[tokio::test]
    async fn test_hour_filter_selects_that_hour() {
        let service = service_with(&[
            local(1, 4, 59),
            local(1, 5, 0),
            local(1, 5, 30),
            local(1, 6, 0),
        ])
        .await;
        let filter = HistoryFilter::parse(Some("2024-01-01"), Some("5")).unwrap();

        let page = service.query(filter, 1).await.unwrap();

        let times: Vec<_> = page
            .entries()
            .map(|e| (e.timestamp.hour(), e.timestamp.minute()))
            .collect();
        assert_eq!(times, vec![(5, 0), (5, 30)]);
        assert_eq!(page.total_frames, 2);
        assert_eq!(page.filter, filter);
    }

    #[tokio::test]
    async fn test_date_filter_selects_local_day() {
        let service = service_with(&[
            local(1, 0, 0),
            local(1, 23, 59),
            local(2, 0, 0),
            // 2024-01-01 22:00 UTC is already 2024-01-02 in Kolkata.
            Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0)
                .unwrap()
                .with_timezone(&Kolkata),
        ])
        .await;
        let filter = HistoryFilter::parse(Some("2024-01-01"), None).unwrap();

        let page = service.query(filter, 1).await.unwrap();

        assert_eq!(page.len(), 2);
        assert!(page
            .entries()
            .all(|e| e.timestamp.date_naive() == NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }

    #[tokio::test]
    async fn test_pagination_slices_ascending() {
        let start = local(1, 0, 0);
        let times: Vec<_> = (0..45).map(|i| start + Duration::minutes(i)).collect();
        let service = service_with(&times).await;

        let first = service.query(HistoryFilter::default(), 1).await.unwrap();
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.len(), 20);
        assert_eq!(first.entries().next().unwrap().timestamp, times[0]);

        let last = service.query(HistoryFilter::default(), 3).await.unwrap();
        let got: Vec<_> = last.entries().map(|e| e.timestamp).collect();
        assert_eq!(got, times[40..45].to_vec());

        let beyond = service.query(HistoryFilter::default(), 4).await.unwrap();
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    /// Store that rejects offsets a signed 64-bit skip cannot carry.
    struct SignedSkipStore(MemoryFrameStore);

    #[async_trait]
    impl FrameStore for SignedSkipStore {
        async fn insert(&self, record: &FrameRecord) -> Result<(), StoreError> {
            self.0.insert(record).await
        }
        async fn count(&self, range: Option<&TimeRange>) -> Result<u64, StoreError> {
            self.0.count(range).await
        }
        async fn delete_oldest(&self, n: u64) -> Result<u64, StoreError> {
            self.0.delete_oldest(n).await
        }
        async fn find(
            &self,
            range: Option<&TimeRange>,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<FrameRecord>, StoreError> {
            if i64::try_from(offset).is_err() {
                return Err(StoreError::Unavailable(format!("skip {offset} out of range")));
            }
            self.0.find(range, offset, limit).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_huge_page_is_empty_not_storage_error() {
        let store = SignedSkipStore(MemoryFrameStore::new());
        store
            .insert(&FrameRecord::new(local(1, 1, 0).with_timezone(&Utc), Bytes::new()))
            .await
            .unwrap();
        let archive = Arc::new(BoundedArchive::new(Arc::new(store), &ArchiveConfig::default()));
        let service = HistoryService::new(archive, Kolkata);

        let page = service
            .query(HistoryFilter::default(), u64::MAX)
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.page, u64::MAX);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_frames, 1);
    }

    #[tokio::test]
    async fn test_page_zero_treated_as_first() {
        let service = service_with(&[local(1, 1, 0)]).await;
        let page = service.query(HistoryFilter::default(), 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_groups_by_local_date() {
        let service = service_with(&[local(2, 8, 0), local(1, 9, 0), local(1, 10, 0)]).await;

        let page = service.query(HistoryFilter::default(), 1).await.unwrap();

        let dates: Vec<_> = page.groups.keys().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02"]);
        let first_day: Vec<_> = page.groups[&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()]
            .iter()
            .map(|e| e.timestamp.hour())
            .collect();
        assert_eq!(first_day, vec![9, 10]);
    }

    #[tokio::test]
    async fn test_empty_archive_has_one_page() {
        let service = service_with(&[]).await;
        let page = service.query(HistoryFilter::default(), 1).await.unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_frames, 0);
        assert!(page.is_empty());
    }
}
