use chrono::{DateTime, FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

use crate::{clock::Clock, config::ButtonColor};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Periodic,
    Spaced,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodUnit {
    Hour,
    Day,
    Month,
    Year,
    Weekdays,
}

impl PeriodUnit {
    /// Singular noun used by the textual form, `None` for weekday lists.
    pub fn noun(self) -> Option<&'static str> {
        match self {
            PeriodUnit::Hour => Some("hour"),
            PeriodUnit::Day => Some("day"),
            PeriodUnit::Month => Some("month"),
            PeriodUnit::Year => Some("year"),
            PeriodUnit::Weekdays => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TimeOfDay {
    #[default]
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

/// The cadence of a note, independent of when it is next due.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repeat {
    pub strategy: Strategy,
    pub period: u32,
    pub period_unit: PeriodUnit,
    pub time_of_day: TimeOfDay,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<Weekday>,
}

impl Repeat {
    pub fn never() -> Self {
        Self {
            strategy: Strategy::None,
            period: 1,
            period_unit: PeriodUnit::Day,
            time_of_day: TimeOfDay::Am,
            weekdays: Vec::new(),
        }
    }

    pub fn new(
        strategy: Strategy,
        period: u32,
        period_unit: PeriodUnit,
        time_of_day: TimeOfDay,
    ) -> Self {
        Self {
            strategy,
            period: period.max(1),
            period_unit,
            time_of_day,
            weekdays: Vec::new(),
        }
    }

    /// Weekday cadence. The list is stored Monday-first without duplicates.
    pub fn on_weekdays(
        strategy: Strategy,
        weekdays: impl IntoIterator<Item = Weekday>,
        time_of_day: TimeOfDay,
    ) -> Self {
        let mut days: Vec<Weekday> = weekdays.into_iter().collect();
        days.sort_by_key(|day| day.num_days_from_monday());
        days.dedup();
        Self {
            strategy,
            period: 1,
            period_unit: PeriodUnit::Weekdays,
            time_of_day,
            weekdays: days,
        }
    }

    pub fn is_never(&self) -> bool {
        self.strategy == Strategy::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScheduleState {
    Unscheduled,
    ScheduledNotDue,
    ScheduledDue,
}

/// Scheduling state of a single note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repetition {
    #[serde(flatten)]
    pub repeat: Repeat,
    pub due_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

impl Repetition {
    pub fn new(repeat: Repeat, due_at: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            repeat,
            due_at,
            hidden: false,
            is_virtual: false,
        }
    }

    pub fn state(&self, clock: &dyn Clock) -> ScheduleState {
        match self.due_at {
            Some(_) if self.repeat.is_never() => ScheduleState::Unscheduled,
            None => ScheduleState::Unscheduled,
            Some(due_at) if due_at <= clock.now() => ScheduleState::ScheduledDue,
            Some(_) => ScheduleState::ScheduledNotDue,
        }
    }

    pub fn is_due(&self, clock: &dyn Clock) -> bool {
        self.state(clock) == ScheduleState::ScheduledDue
    }

    /// Same cadence, new due instant. The result is always a persisted note.
    pub fn rescheduled(&self, due_at: DateTime<FixedOffset>) -> Self {
        Self {
            repeat: self.repeat.clone(),
            due_at: Some(due_at),
            hidden: self.hidden,
            is_virtual: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NextRepetition {
    Repetition(Repetition),
    /// Leave the note untouched for this session.
    Dismiss,
    /// Take the note out of the review rotation.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatChoice {
    pub text: String,
    pub color: Option<ButtonColor>,
    pub next_repetition: NextRepetition,
}

impl RepeatChoice {
    pub fn new(text: impl Into<String>, next_repetition: NextRepetition) -> Self {
        Self {
            text: text.into(),
            color: None,
            next_repetition,
        }
    }

    pub fn with_color(mut self, color: ButtonColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn repetition(&self) -> Option<&Repetition> {
        match &self.next_repetition {
            NextRepetition::Repetition(repetition) => Some(repetition),
            NextRepetition::Dismiss | NextRepetition::Never => None,
        }
    }
}
