//! Calendar bucketing for order timestamps
//!
//! All truncation happens in the timestamp's own offset; nothing here converts
//! between time zones. Weeks start on Monday regardless of platform or locale.

use crate::types::Timestamp;
use chrono::{Datelike, Duration, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// Calendar bucket keys derived from a single timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarBuckets {
    pub date: NaiveDate,
    pub week: NaiveDate,
    pub month: NaiveDate,
    pub quarter: NaiveDate,
    pub year: NaiveDate,
    /// 0-23
    pub hour: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u32,
}

impl CalendarBuckets {
    pub fn from_timestamp(ts: &Timestamp) -> Self {
        let date = ts.date_naive();
        Self {
            date,
            week: week_start(date),
            month: month_start(date),
            quarter: quarter_start(date),
            year: year_start(date),
            hour: ts.hour(),
            day_of_week: date.weekday().num_days_from_sunday(),
        }
    }
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// First day of the quarter containing `date`
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month() - 1) / 3 * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

/// January 1st of the year containing `date`
pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// First day of the month before the one containing `date`
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

/// Every date from `start` to `end`, inclusive
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        current += Duration::days(1);
    }
    days
}
