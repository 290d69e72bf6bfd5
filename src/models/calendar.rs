//! Time windows.
//!
//! Two flavours of window are used by the engine:
//!
//! - [`TimeWindow`]: an absolute half-open interval `[start, end)` in
//!   seconds. Resources declare their availability as a list of these.
//! - [`DailyWindow`]: a recurring time-of-day window (e.g. a shift). When
//!   `end <= start` the window runs overnight and ends on the next day.
//!
//! # Time Model
//! Timestamps are seconds since the Unix epoch, interpreted on the UTC
//! calendar when a day boundary matters.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Timestamp;

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: Timestamp,
    /// Interval end (exclusive).
    pub end: Timestamp,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Duration of this window (seconds).
    #[inline]
    pub fn duration_secs(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether `[start, end)` lies entirely inside this window.
    #[inline]
    pub fn covers(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start <= start && end <= self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Length of the intersection with `[start, end)`, zero if disjoint.
    pub fn overlap_secs(&self, start: Timestamp, end: Timestamp) -> i64 {
        (self.end.min(end) - self.start.max(start)).max(0)
    }
}

/// A recurring daily window between two times of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyWindow {
    /// Time of day the window opens.
    pub start: NaiveTime,
    /// Time of day the window closes. `end <= start` wraps past midnight.
    pub end: NaiveTime,
}

impl DailyWindow {
    /// Creates a window from two times of day.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Creates a window from `(hour, minute)` pairs.
    ///
    /// Returns `None` if either pair is not a valid time of day.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    /// Whether the window crosses midnight.
    #[inline]
    pub fn is_overnight(&self) -> bool {
        self.end <= self.start
    }

    /// The concrete interval of this window opening on `day`.
    pub fn on_day(&self, day: NaiveDate) -> TimeWindow {
        let start = day.and_time(self.start).and_utc().timestamp();
        let mut end = day.and_time(self.end).and_utc().timestamp();
        if self.is_overnight() {
            end += Duration::days(1).num_seconds();
        }
        TimeWindow::new(start, end)
    }
}

/// UTC calendar day containing a timestamp.
pub fn utc_day(t: Timestamp) -> NaiveDate {
    DateTime::from_timestamp(t, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Whether `[start, end)` fits inside at least one window.
///
/// An empty window list means "always available".
pub fn fits_any(windows: &[TimeWindow], start: Timestamp, end: Timestamp) -> bool {
    windows.is_empty() || windows.iter().any(|w| w.covers(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(100, 200);
        assert_eq!(w.duration_secs(), 100);
        assert!(w.contains(100));
        assert!(w.contains(199));
        assert!(!w.contains(200)); // exclusive end
        assert!(!w.contains(50));
        assert!(w.covers(100, 200));
        assert!(!w.covers(150, 201));
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(0, 100);
        let b = TimeWindow::new(50, 150);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert_eq!(a.overlap_secs(50, 150), 50);

        let c = TimeWindow::new(100, 200); // touching but not overlapping
        assert!(!a.overlaps(&c));
        assert_eq!(a.overlap_secs(100, 200), 0);
    }

    #[test]
    fn test_daily_window_same_day() {
        let w = DailyWindow::new(hm(6, 0), hm(18, 0));
        assert!(!w.is_overnight());
        let day = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        let tw = w.on_day(day);
        assert_eq!(tw.start, DAY + 6 * 3600);
        assert_eq!(tw.end, DAY + 18 * 3600);
    }

    #[test]
    fn test_daily_window_overnight() {
        let w = DailyWindow::from_hm((22, 0), (6, 0)).unwrap();
        assert!(w.is_overnight());
        let day = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let tw = w.on_day(day);
        assert_eq!(tw.start, 22 * 3600);
        assert_eq!(tw.end, DAY + 6 * 3600);
    }

    #[test]
    fn test_midnight_to_midnight_is_full_day() {
        let w = DailyWindow::from_hm((0, 0), (0, 0)).unwrap();
        let tw = w.on_day(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(tw.duration_secs(), DAY);
    }

    #[test]
    fn test_invalid_hm() {
        assert!(DailyWindow::from_hm((25, 0), (6, 0)).is_none());
    }

    #[test]
    fn test_utc_day_and_fits_any() {
        assert_eq!(utc_day(DAY + 5), NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
        assert!(fits_any(&[], 0, 10));
        let windows = [TimeWindow::new(0, 10), TimeWindow::new(20, 30)];
        assert!(fits_any(&windows, 20, 30));
        assert!(!fits_any(&windows, 5, 25));
    }
}
