//! Calendar-day normalization against the single reference timezone

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Turns instants into calendar days of the reference timezone.
///
/// Every day-granularity comparison in the crate (conflict windows, due sets)
/// goes through one of these so a day boundary means the same thing everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCalendar {
    offset: FixedOffset,
}

impl ReferenceCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day on which `instant` falls in the reference timezone
    pub fn calendar_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar_day(Utc::now())
    }
}

impl Default for ReferenceCalendar {
    fn default() -> Self {
        Self::utc()
    }
}
