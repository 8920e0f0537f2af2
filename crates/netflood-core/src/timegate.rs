//! Time gate: daily windows during which a run may download.
//!
//! Spec strings are comma-separated `HH:MM-HH:MM` ranges:
//!
//!   12:00-13:00,14:00-15:00
//!   23:00-01:00              (end before start = spans midnight)
//!
//! An empty string disables the gate; a disabled gate is always in range.
//! Windows are half-open: the start minute is inside, the end minute is not.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, Timelike};

/// Label rendered for a disabled gate.
pub const ALWAYS_ON_LABEL: &str = "全天候运行";

const MINUTES_PER_DAY: u32 = 24 * 60;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A rejected time spec. Any malformed range rejects the whole string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeSpecError {
    #[error("invalid time range {0:?} (expected HH:MM-HH:MM)")]
    BadRange(String),
    #[error("invalid time {0:?} (expected HH:MM)")]
    BadClock(String),
    #[error("invalid hour {0:?}")]
    BadHour(String),
    #[error("invalid minute {0:?}")]
    BadMinute(String),
    #[error("hour must be between 0 and 23, got {0}")]
    HourOutOfRange(u32),
    #[error("minute must be between 0 and 59, got {0}")]
    MinuteOutOfRange(u32),
    #[error("no time ranges in {0:?}")]
    NoRanges(String),
}

// ── TimeWindow ────────────────────────────────────────────────────────────────

/// One daily window, in minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeWindow {
    start: u32,
    end: u32,
}

impl TimeWindow {
    fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    fn contains(&self, minute: u32) -> bool {
        if self.wraps_midnight() {
            minute >= self.start || minute < self.end
        } else {
            minute >= self.start && minute < self.end
        }
    }

    /// Minutes from `minute` until this window next opens. A start that has
    /// already passed today (or is right now) rolls over to tomorrow.
    fn minutes_until_start(&self, minute: u32) -> u32 {
        if self.start > minute {
            self.start - minute
        } else {
            MINUTES_PER_DAY - minute + self.start
        }
    }

    fn parse(segment: &str) -> Result<Self, TimeSpecError> {
        let bounds: Vec<&str> = segment.split('-').collect();
        let [start, end] = bounds.as_slice() else {
            return Err(TimeSpecError::BadRange(segment.to_string()));
        };
        let start = parse_clock(start.trim())?;
        let end = parse_clock(end.trim())?;
        Ok(Self { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// `HH:MM` → minute of day.
fn parse_clock(text: &str) -> Result<u32, TimeSpecError> {
    let parts: Vec<&str> = text.split(':').collect();
    let [hour, minute] = parts.as_slice() else {
        return Err(TimeSpecError::BadClock(text.to_string()));
    };

    let hour: u32 = hour
        .trim()
        .parse()
        .map_err(|_| TimeSpecError::BadHour(hour.to_string()))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| TimeSpecError::BadMinute(minute.to_string()))?;

    if hour > 23 {
        return Err(TimeSpecError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(TimeSpecError::MinuteOutOfRange(minute));
    }
    Ok(hour * 60 + minute)
}

/// Minute of day for any clock-bearing value (`NaiveTime`, `DateTime<Local>`, ...).
pub fn minute_of_day<T: Timelike>(now: &T) -> u32 {
    now.hour() * 60 + now.minute()
}

// ── TimeGate ──────────────────────────────────────────────────────────────────

/// A set of daily windows. No windows = disabled = always in range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeGate {
    windows: Vec<TimeWindow>,
}

impl TimeGate {
    pub fn always_on() -> Self {
        Self::default()
    }

    /// Parse a spec string. Empty input disables the gate.
    pub fn parse(spec: &str) -> Result<Self, TimeSpecError> {
        if spec.is_empty() {
            return Ok(Self::always_on());
        }

        let windows = spec
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(TimeWindow::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if windows.is_empty() {
            return Err(TimeSpecError::NoRanges(spec.to_string()));
        }
        Ok(Self { windows })
    }

    pub fn is_enabled(&self) -> bool {
        !self.windows.is_empty()
    }

    pub fn is_in_range<T: Timelike>(&self, now: &T) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let minute = minute_of_day(now);
        self.windows.iter().any(|w| w.contains(minute))
    }

    /// Time until the nearest window opens; zero when already in range.
    pub fn wait_until_next<T: Timelike>(&self, now: &T) -> Duration {
        if self.is_in_range(now) {
            return Duration::ZERO;
        }
        let minute = minute_of_day(now);
        let wait = self
            .windows
            .iter()
            .map(|w| w.minutes_until_start(minute))
            .min()
            .unwrap_or(0);
        Duration::from_secs(u64::from(wait) * 60)
    }

    pub fn is_in_range_now(&self) -> bool {
        self.is_in_range(&Local::now())
    }

    pub fn wait_until_next_now(&self) -> Duration {
        self.wait_until_next(&Local::now())
    }

    /// Wall-clock time the next window opens, or now if already in range.
    pub fn next_start_now(&self) -> DateTime<Local> {
        let now = Local::now();
        let wait = self.wait_until_next(&now);
        match chrono::Duration::from_std(wait) {
            Ok(wait) => now + wait,
            Err(_) => now,
        }
    }
}

impl FromStr for TimeGate {
    type Err = TimeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_enabled() {
            return f.write_str(ALWAYS_ON_LABEL);
        }
        for (i, window) in self.windows.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{window}")?;
        }
        Ok(())
    }
}
