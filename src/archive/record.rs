//! Archived frame records and timestamp ranges.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};

/// A single archived frame.
///
/// Records are immutable once built. The store-assigned identity never
/// leaves the store implementation, so it is not part of this type.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Capture instant, truncated to millisecond precision.
    timestamp: DateTime<Utc>,
    /// Encoded JPEG payload.
    image: Bytes,
}

impl FrameRecord {
    /// Creates a record, truncating the timestamp to milliseconds.
    ///
    /// Millisecond precision matches what the document store keeps, so a
    /// record reads back with exactly the timestamp it was written with.
    pub fn new(timestamp: DateTime<Utc>, image: Bytes) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            image,
        }
    }

    /// Rebuilds a record from its base64 stored form.
    pub fn from_base64(
        timestamp: DateTime<Utc>,
        encoded: &str,
    ) -> Result<Self, base64::DecodeError> {
        let image = STANDARD.decode(encoded)?;
        Ok(Self::new(timestamp, Bytes::from(image)))
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the encoded JPEG bytes.
    #[inline]
    pub fn image(&self) -> &Bytes {
        &self.image
    }

    /// Returns the payload as standard base64, the text-safe stored form.
    pub fn image_base64(&self) -> String {
        STANDARD.encode(&self.image)
    }
}

impl std::fmt::Debug for FrameRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRecord")
            .field("timestamp", &self.timestamp)
            .field("image_bytes", &self.image.len())
            .finish()
    }
}

/// An inclusive range of instants, `start <= t <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns true if `instant` falls within the range, bounds included.
    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_truncated_to_millis() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let record = FrameRecord::new(ts, Bytes::from_static(b"jpeg"));
        assert_eq!(record.timestamp().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_base64_stored_form() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let record = FrameRecord::new(ts, Bytes::from_static(&[0xFF, 0xD8, 0xFF]));
        let encoded = record.image_base64();
        assert_eq!(encoded, "/9j/");

        let restored = FrameRecord::from_base64(ts, &encoded).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_malformed_base64_rejected() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(FrameRecord::from_base64(ts, "not base64!").is_err());
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 5, 59, 59).unwrap();
        let range = TimeRange::new(start, end);

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(start - chrono::Duration::milliseconds(1)));
        assert!(!range.contains(end + chrono::Duration::milliseconds(1)));
    }
}
