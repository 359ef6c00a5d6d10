//! Date/hour filters and their time ranges.

use crate::archive::TimeRange;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Filter parsing and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid hour {0:?}, expected 0-23")]
    InvalidHour(String),
    #[error("local time {0} does not exist in the configured timezone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// Optional calendar-date and hour restriction on a history query.
///
/// The hour only applies together with a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub date: Option<NaiveDate>,
    pub hour: Option<u32>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl HistoryFilter {
    /// Parses raw query parameters.
    ///
    /// Empty values count as absent. An hour given without a date is
    /// ignored without being validated.
    pub fn parse(date: Option<&str>, hour: Option<&str>) -> Result<Self, FilterError> {
        let Some(date) = non_empty(date) else {
            return Ok(Self::default());
        };
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| FilterError::InvalidDate(date.to_string()))?;

        let hour = match non_empty(hour) {
            Some(raw) => {
                let hour = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|h| *h < 24)
                    .ok_or_else(|| FilterError::InvalidHour(raw.to_string()))?;
                Some(hour)
            }
            None => None,
        };

        Ok(Self {
            date: Some(date),
            hour,
        })
    }

    /// Resolves the filter to an inclusive UTC range in `timezone`.
    ///
    /// A date alone covers the whole local day; a date and hour cover
    /// every instant whose local time falls in that hour, including both
    /// occurrences of a repeated hour on a fall-back day. Each range ends
    /// one millisecond before the next day or hour begins. Returns `None`
    /// when no date is set.
    ///
    /// A day starting inside a DST gap starts when the gap ends. An hour
    /// that does not exist locally is an error.
    pub fn time_range(&self, timezone: &Tz) -> Result<Option<TimeRange>, FilterError> {
        let Some(date) = self.date else {
            return Ok(None);
        };

        let midnight = date.and_time(NaiveTime::MIN);
        let (start, end) = match self.hour {
            Some(hour) => {
                let local = midnight + Duration::hours(hour as i64);
                let resolved = timezone.from_local_datetime(&local);
                let (Some(first), Some(last)) = (resolved.earliest(), resolved.latest()) else {
                    return Err(FilterError::NonexistentLocalTime(local));
                };
                (
                    first.with_timezone(&Utc),
                    last.with_timezone(&Utc) + Duration::hours(1),
                )
            }
            None => (
                day_boundary(timezone, midnight)?,
                day_boundary(timezone, midnight + Duration::days(1))?,
            ),
        };

        Ok(Some(TimeRange::new(start, end - Duration::milliseconds(1))))
    }
}

/// Longest DST gap searched past a missing midnight.
const MAX_GAP_MINUTES: u32 = 24 * 60;

/// Maps a local midnight to UTC, taking the earlier instant when the
/// time is ambiguous and the first local time after the gap when it is
/// skipped.
fn day_boundary(timezone: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, FilterError> {
    let mut candidate = local;
    for _ in 0..=MAX_GAP_MINUTES {
        if let Some(t) = timezone.from_local_datetime(&candidate).earliest() {
            return Ok(t.with_timezone(&Utc));
        }
        candidate += Duration::minutes(1);
    }
    Err(FilterError::NonexistentLocalTime(local))
}
