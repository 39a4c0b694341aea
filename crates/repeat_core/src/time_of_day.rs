use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::{config::ReviewConfig, repeat::TimeOfDay};

/// Clock time (`HH:MM`, 24-hour) that due timestamps snap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReviewTime {
    hour: u32,
    minute: u32,
}

impl ReviewTime {
    pub const NOON: ReviewTime = ReviewTime {
        hour: 12,
        minute: 0,
    };
    pub const LAST_MORNING_MINUTE: ReviewTime = ReviewTime {
        hour: 11,
        minute: 59,
    };
    pub const DEFAULT_MORNING: ReviewTime = ReviewTime { hour: 6, minute: 0 };
    pub const DEFAULT_EVENING: ReviewTime = ReviewTime {
        hour: 18,
        minute: 0,
    };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Accepts `HH:MM` or a bare `HH`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (hour, minute) = match text.split_once(':') {
            Some((hour, minute)) => (hour, minute),
            None => (text, "0"),
        };
        Self::new(parse_component(hour)?, parse_component(minute)?)
    }

    /// Morning times always land before noon.
    pub fn clamp_morning(self) -> Self {
        if self >= Self::NOON {
            Self::LAST_MORNING_MINUTE
        } else {
            self
        }
    }

    /// Evening times always land at or after noon.
    pub fn clamp_evening(self) -> Self {
        if self < Self::NOON {
            Self::NOON
        } else {
            self
        }
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }
}

fn parse_component(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 2 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for ReviewTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Clock time configured for the given half of the day.
pub fn resolve_time_of_day(config: &ReviewConfig, time_of_day: TimeOfDay) -> ReviewTime {
    match time_of_day {
        TimeOfDay::Am => config.morning_review_time(),
        TimeOfDay::Pm => config.evening_review_time(),
    }
}

/// The instant on `date` at `time`, in `offset`.
pub(crate) fn at_review_time(
    date: NaiveDate,
    time: ReviewTime,
    offset: FixedOffset,
) -> DateTime<FixedOffset> {
    let local = date.and_time(time.as_naive_time());
    // A fixed offset maps every local time to exactly one instant.
    offset
        .from_local_datetime(&local)
        .single()
        .unwrap_or_else(|| offset.from_utc_datetime(&local))
}

/// Keeps the calendar date of `instant` and replaces its clock time.
pub(crate) fn snap_to_review_time(
    instant: DateTime<FixedOffset>,
    time: ReviewTime,
) -> DateTime<FixedOffset> {
    at_review_time(instant.date_naive(), time, *instant.offset())
}
