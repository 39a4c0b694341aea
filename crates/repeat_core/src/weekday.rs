use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Weekday};

use crate::{
    config::ReviewConfig,
    repeat::TimeOfDay,
    time_of_day::{at_review_time, resolve_time_of_day},
};

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Full or three-letter weekday name, any case.
pub fn parse_weekday(word: &str) -> Option<Weekday> {
    word.trim().parse().ok()
}

/// First allowed weekday strictly after `now`, at the review time for `time_of_day`.
///
/// Today only qualifies while its review time is still ahead. Returns `None`
/// for an empty weekday set.
pub fn next_weekday_occurrence(
    now: DateTime<FixedOffset>,
    weekdays: &[Weekday],
    time_of_day: TimeOfDay,
    config: &ReviewConfig,
) -> Option<DateTime<FixedOffset>> {
    let time = resolve_time_of_day(config, time_of_day);
    let today = now.date_naive();
    // Eight days so that a single allowed weekday equal to today wraps to next week.
    (0..=7u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| weekdays.contains(&date.weekday()))
        .map(|date| at_review_time(date, time, *now.offset()))
        .find(|candidate| *candidate > now)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(date)
}

/// `"Tuesday"` inside the current Monday-based week, `"next Tuesday"` beyond it.
pub fn occurrence_label(now: DateTime<FixedOffset>, target: DateTime<FixedOffset>) -> String {
    let name = capitalize(weekday_name(target.weekday()));
    if week_start(target.date_naive()) > week_start(now.date_naive()) {
        format!("next {name}")
    } else {
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
