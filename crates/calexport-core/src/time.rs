//! Time types for calendar events.
//!
//! [`EventTime`] carries an event bound exactly as the calendar source
//! reported it (an all-day date or a date-time with its UTC offset), and
//! [`TimeWindow`] defines the range an export run queries.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// The start or end of a calendar event.
///
/// The two shapes are kept apart all the way to the output file so that
/// all-day entries stay all-day and timed entries keep their offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A date without a time of day.
    Date(NaiveDate),
    /// A point in time with the offset it was reported in.
    DateTime(DateTime<FixedOffset>),
}

impl EventTime {
    /// Creates a new `EventTime::Date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Creates a new `EventTime::DateTime`, keeping the given offset.
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }

    /// Returns `true` for a date-only bound.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the date if this is a `Date` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::Date(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::Date(_) => None,
        }
    }

    /// Wall-clock reading of this bound. Dates read as midnight.
    fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::Date(d) => d.and_time(NaiveTime::MIN),
            Self::DateTime(dt) => dt.naive_local(),
        }
    }

    /// Returns the elapsed time from `self` to `end`.
    ///
    /// Two date-times are compared as instants. When either side is a date,
    /// the date is read as midnight in the wall clock of the other side, so a
    /// one-day all-day event spans exactly 24 hours.
    pub fn span_until(&self, end: &EventTime) -> Duration {
        match (self, end) {
            (Self::DateTime(start), Self::DateTime(end)) => *end - *start,
            _ => end.naive_local() - self.naive_local(),
        }
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the window `[now - days_ago, now + days_ahead)`.
    ///
    /// Returns `None` when either bound falls outside the representable
    /// date range.
    pub fn around(now: DateTime<Utc>, days_ago: u32, days_ahead: u32) -> Option<Self> {
        let start = now.checked_sub_signed(Duration::days(i64::from(days_ago)))?;
        let end = now.checked_add_signed(Duration::days(i64::from(days_ahead)))?;
        Some(Self::new(start, end))
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}
