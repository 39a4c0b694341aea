use std::fmt;

use chrono::{DateTime, Days, Duration, FixedOffset, Months};
use tracing::{debug, warn};

use crate::{
    clock::Clock,
    config::ReviewConfig,
    repeat::{PeriodUnit, Repeat},
    time_of_day::{resolve_time_of_day, snap_to_review_time, ReviewTime},
    weekday::next_weekday_occurrence,
};

/// A period scaled by a multiplier and broken into calendar-aware parts,
/// e.g. 1.5 months becomes one month plus the matching share of the next month's days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledPeriod {
    major: u32,
    major_unit: PeriodUnit,
    minor: u32,
    minor_unit: PeriodUnit,
}

impl ScaledPeriod {
    /// Weekday cadences count as one day per period.
    pub fn scale(repeat: &Repeat, multiplier: f64, now: DateTime<FixedOffset>) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier > 0.0 {
            multiplier
        } else {
            1.0
        };
        let amount = f64::from(repeat.period.max(1)) * multiplier;
        match repeat.period_unit {
            PeriodUnit::Hour => Self::single(to_count(amount).max(1), PeriodUnit::Hour),
            PeriodUnit::Day => Self::single(to_count(amount).max(1), PeriodUnit::Day),
            PeriodUnit::Weekdays => Self::single(to_count(multiplier).max(1), PeriodUnit::Day),
            PeriodUnit::Year => {
                let months = to_count(amount * 12.0).max(1);
                Self::split(months, 12, PeriodUnit::Year, PeriodUnit::Month)
            }
            PeriodUnit::Month => {
                let whole = amount.floor();
                let months = to_count(whole);
                let anchor = add_units(now, months, PeriodUnit::Month).unwrap_or(now);
                let month_days = add_units(anchor, 1, PeriodUnit::Month)
                    .map(|next| (next - anchor).num_days())
                    .unwrap_or(30);
                let mut days = to_count((amount - whole) * month_days as f64);
                if months == 0 && days == 0 {
                    days = 1;
                }
                Self {
                    major: months,
                    major_unit: PeriodUnit::Month,
                    minor: days,
                    minor_unit: PeriodUnit::Day,
                }
            }
        }
    }

    fn single(count: u32, unit: PeriodUnit) -> Self {
        Self {
            major: count,
            major_unit: unit,
            minor: 0,
            minor_unit: unit,
        }
    }

    fn split(total: u32, per_major: u32, major_unit: PeriodUnit, minor_unit: PeriodUnit) -> Self {
        Self {
            major: total / per_major,
            major_unit,
            minor: total % per_major,
            minor_unit,
        }
    }

    /// The next longer period at this unit's finest granularity.
    fn step_up(self) -> Self {
        match self.major_unit {
            PeriodUnit::Year => {
                let months = self.major.saturating_mul(12).saturating_add(self.minor);
                Self::split(months.saturating_add(1), 12, PeriodUnit::Year, PeriodUnit::Month)
            }
            PeriodUnit::Month => Self {
                minor: self.minor.saturating_add(1),
                ..self
            },
            PeriodUnit::Hour | PeriodUnit::Day | PeriodUnit::Weekdays => Self {
                major: self.major.saturating_add(1),
                ..self
            },
        }
    }

    pub fn apply(&self, start: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let shifted = add_units(start, self.major, self.major_unit)?;
        add_units(shifted, self.minor, self.minor_unit)
    }
}

impl fmt::Display for ScaledPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [(self.major, self.major_unit), (self.minor, self.minor_unit)]
            .into_iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, unit)| {
                let noun = unit.noun().unwrap_or("day");
                if count == 1 {
                    format!("{count} {noun}")
                } else {
                    format!("{count} {noun}s")
                }
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}

fn to_count(amount: f64) -> u32 {
    // `as` saturates at the bounds of u32.
    amount.round() as u32
}

fn add_units(
    instant: DateTime<FixedOffset>,
    amount: u32,
    unit: PeriodUnit,
) -> Option<DateTime<FixedOffset>> {
    match unit {
        PeriodUnit::Hour => instant.checked_add_signed(Duration::hours(i64::from(amount))),
        PeriodUnit::Day | PeriodUnit::Weekdays => {
            instant.checked_add_days(Days::new(u64::from(amount)))
        }
        PeriodUnit::Month => instant.checked_add_months(Months::new(amount)),
        PeriodUnit::Year => instant.checked_add_months(Months::new(amount.checked_mul(12)?)),
    }
}

/// Next due instant one full period from now.
pub fn increment_due_at(
    repeat: &Repeat,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> DateTime<FixedOffset> {
    increment_due_at_by(repeat, config, clock, 1.0)
}

/// Next due instant `multiplier` periods from now, strictly after now.
///
/// Weekday cadences ignore the multiplier. Everything coarser than an hour
/// lands on the configured review time for the repeat's half of the day.
pub fn increment_due_at_by(
    repeat: &Repeat,
    config: &ReviewConfig,
    clock: &dyn Clock,
    multiplier: f64,
) -> DateTime<FixedOffset> {
    let now = clock.now();
    let review_time = resolve_time_of_day(config, repeat.time_of_day);

    if repeat.period_unit == PeriodUnit::Weekdays {
        if let Some(next) =
            next_weekday_occurrence(now, &repeat.weekdays, repeat.time_of_day, config)
        {
            return next;
        }
        warn!("weekday repeat without weekdays, scheduling for tomorrow");
        return snap_to_review_time(now + Duration::days(1), review_time);
    }

    let scaled = ScaledPeriod::scale(repeat, multiplier, now);
    let due = due_for_period(repeat, scaled, review_time, now);
    debug!(%due, %scaled, multiplier, "incremented due date");
    due
}

/// Hour periods are exact elapsed time, everything else lands on `review_time`
/// strictly after `now`.
fn due_for_period(
    repeat: &Repeat,
    scaled: ScaledPeriod,
    review_time: ReviewTime,
    now: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let raw = scaled.apply(now).unwrap_or(now + Duration::days(1));
    if repeat.period_unit == PeriodUnit::Hour {
        return raw;
    }
    let snapped = snap_to_review_time(raw, review_time);
    if snapped > now {
        snapped
    } else {
        snapped + Duration::days(1)
    }
}

/// One due instant per multiplier, each strictly later than the one before.
///
/// A multiplier whose rounded period would land on the previous instant is
/// stepped up at the unit's granularity, so the returned period always
/// describes the interval actually applied.
pub fn multiplier_due_dates(
    repeat: &Repeat,
    config: &ReviewConfig,
    clock: &dyn Clock,
    multipliers: &[f64],
) -> Vec<(ScaledPeriod, DateTime<FixedOffset>)> {
    let now = clock.now();
    let review_time = resolve_time_of_day(config, repeat.time_of_day);
    let mut dates: Vec<(ScaledPeriod, DateTime<FixedOffset>)> =
        Vec::with_capacity(multipliers.len());
    for &multiplier in multipliers {
        let mut scaled = ScaledPeriod::scale(repeat, multiplier, now);
        let mut due = due_for_period(repeat, scaled, review_time, now);
        if let Some(&(_, previous)) = dates.last() {
            while due <= previous {
                let stepped = scaled.step_up();
                if stepped == scaled || stepped.apply(now).is_none() {
                    break;
                }
                scaled = stepped;
                due = due_for_period(repeat, scaled, review_time, now);
            }
        }
        dates.push((scaled, due));
    }
    debug!(count = dates.len(), "computed multiplier due dates");
    dates
}

/// Due instant for a skipped review: one full period of exact elapsed time,
/// moved on by whole hours (hour cadences) or days until it differs from
/// every instant in `taken`.
pub fn skip_due_at(
    repeat: &Repeat,
    clock: &dyn Clock,
    taken: &[DateTime<FixedOffset>],
) -> DateTime<FixedOffset> {
    let now = clock.now();
    let mut due = ScaledPeriod::scale(repeat, 1.0, now)
        .apply(now)
        .or_else(|| now.checked_add_signed(Duration::days(1)))
        .unwrap_or(now);
    let step = if repeat.period_unit == PeriodUnit::Hour {
        Duration::hours(1)
    } else {
        Duration::days(1)
    };
    while taken.contains(&due) {
        match due.checked_add_signed(step) {
            Some(next) => due = next,
            None => break,
        }
    }
    due
}
