//! Daily time-of-day window during which polling is permitted.

use chrono::{NaiveTime, TimeDelta};
use std::time::Duration;

/// The date-independent `(start, end)` window.
///
/// Both bounds are exclusive: a tick at exactly `start` or exactly `end` is
/// outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ActiveWindow {
    /// Returns `None` unless `start` is strictly before `end`.
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start < time && time < self.end
    }

    /// How long to wait from `now` until the first instant the window admits.
    ///
    /// Zero when `now` is already inside. Otherwise the target is one second
    /// past `start`, today if `start` is still ahead, tomorrow if the window
    /// has already closed.
    #[must_use]
    pub fn time_until_open(&self, now: NaiveTime) -> Duration {
        if self.contains(now) {
            return Duration::ZERO;
        }

        let target = self.start + TimeDelta::seconds(1);
        let mut delta = target.signed_duration_since(now);
        if delta <= TimeDelta::zero() {
            delta += TimeDelta::days(1);
        }
        delta.to_std().unwrap_or(Duration::ZERO)
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
}
