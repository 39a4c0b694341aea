use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{
    repeat::{NextRepetition, PeriodUnit, Repeat, Repetition, Strategy, TimeOfDay},
    weekday::{parse_weekday, weekday_name},
};

/// Metadata values written back to a note. `None` means the key should be removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SerializedRepetition {
    pub repeat: String,
    pub due_at: Option<String>,
    pub hidden: Option<bool>,
}

/// Parses the human-authored `repeat` value. Unrecognised text yields `None`.
///
/// ```text
/// never
/// every 3 days
/// every tuesday, thursday in the evening
/// spaced every 24 hours
/// spaced every month in the morning
/// ```
pub fn parse_repeat(text: &str) -> Option<Repeat> {
    let lowered = text.trim().to_lowercase();
    let mut words: Vec<&str> = lowered
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty())
        .collect();

    if words == ["never"] {
        return Some(Repeat::never());
    }

    let strategy = if words.first() == Some(&"spaced") {
        words.remove(0);
        Strategy::Spaced
    } else {
        Strategy::Periodic
    };
    if words.first() != Some(&"every") {
        return None;
    }
    words.remove(0);

    let time_of_day = match words.as_slice() {
        [.., "in", "the", "morning"] => Some(TimeOfDay::Am),
        [.., "in", "the", "evening"] => Some(TimeOfDay::Pm),
        _ => None,
    };
    if time_of_day.is_some() {
        words.truncate(words.len() - 3);
    }
    let time_of_day = time_of_day.unwrap_or_default();

    match words.as_slice() {
        [] => None,
        [count, unit] if count.chars().all(|c| c.is_ascii_digit()) => {
            let count: u32 = count.parse().ok().filter(|count| *count > 0)?;
            interval(strategy, count, unit, time_of_day)
        }
        [unit] if parse_unit(unit).is_some() => interval(strategy, 1, unit, time_of_day),
        days => {
            let weekdays = days
                .iter()
                .filter(|word| **word != "and")
                .map(|word| parse_weekday(word))
                .collect::<Option<Vec<_>>>()?;
            if weekdays.is_empty() {
                return None;
            }
            Some(Repeat::on_weekdays(strategy, weekdays, time_of_day))
        }
    }
}

fn interval(strategy: Strategy, count: u32, unit: &str, time_of_day: TimeOfDay) -> Option<Repeat> {
    let (unit, factor) = parse_unit(unit)?;
    let period = count.checked_mul(factor)?;
    Some(Repeat::new(strategy, period, unit, time_of_day))
}

/// Unit word, singular or plural. Weeks are stored as seven days.
fn parse_unit(word: &str) -> Option<(PeriodUnit, u32)> {
    let singular = word.strip_suffix('s').unwrap_or(word);
    match singular {
        "hour" => Some((PeriodUnit::Hour, 1)),
        "day" => Some((PeriodUnit::Day, 1)),
        "week" => Some((PeriodUnit::Day, 7)),
        "month" => Some((PeriodUnit::Month, 1)),
        "year" => Some((PeriodUnit::Year, 1)),
        _ => None,
    }
}

/// Canonical text for `repeat`; always accepted by [`parse_repeat`].
pub fn serialize_repeat(repeat: &Repeat) -> String {
    if repeat.is_never() {
        return "never".to_string();
    }
    let mut text = String::new();
    if repeat.strategy == Strategy::Spaced {
        text.push_str("spaced ");
    }
    text.push_str("every ");
    match repeat.period_unit.noun() {
        Some(noun) => {
            text.push_str(&format!("{} {}", repeat.period, noun));
            if repeat.period != 1 {
                text.push('s');
            }
        }
        None => {
            let names: Vec<&str> = repeat.weekdays.iter().map(|day| weekday_name(*day)).collect();
            text.push_str(&names.join(", "));
        }
    }
    if repeat.time_of_day == TimeOfDay::Pm {
        text.push_str(" in the evening");
    }
    text
}

pub fn format_due_at(due_at: &DateTime<FixedOffset>) -> String {
    due_at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// RFC 3339, or a zone-less date/time read in `offset`.
pub fn parse_due_at(text: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(due_at) = DateTime::parse_from_rfc3339(text) {
        return Some(due_at);
    }
    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    offset.from_local_datetime(&naive).single()
}

pub fn serialize_repetition(repetition: &Repetition) -> SerializedRepetition {
    SerializedRepetition {
        repeat: serialize_repeat(&repetition.repeat),
        due_at: repetition.due_at.as_ref().map(format_due_at),
        hidden: repetition.hidden.then_some(true),
    }
}

impl NextRepetition {
    /// Metadata to write for this outcome. `Dismiss` leaves the note untouched.
    pub fn serialize(&self) -> Option<SerializedRepetition> {
        match self {
            NextRepetition::Repetition(repetition) => Some(serialize_repetition(repetition)),
            NextRepetition::Dismiss => None,
            NextRepetition::Never => Some(SerializedRepetition {
                repeat: serialize_repeat(&Repeat::never()),
                due_at: None,
                hidden: None,
            }),
        }
    }
}

/// Rebuilds a descriptor from stored metadata. `None` when `repeat` is unparseable.
pub fn deserialize_repetition(
    stored: &SerializedRepetition,
    offset: FixedOffset,
) -> Option<Repetition> {
    let repeat = parse_repeat(&stored.repeat)?;
    let due_at = stored
        .due_at
        .as_deref()
        .and_then(|text| parse_due_at(text, offset));
    Some(Repetition {
        repeat,
        due_at,
        hidden: stored.hidden.unwrap_or(false),
        is_virtual: false,
    })
}

/// Parses only the `repeat` text into an unscheduled descriptor.
pub fn parse_repetition(text: &str) -> Option<Repetition> {
    parse_repeat(text).map(|repeat| Repetition::new(repeat, None))
}

/// `#[serde(with = "repeat_text")]` stores a [`Repeat`] as its textual form.
pub mod repeat_text {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{parse_repeat, serialize_repeat};
    use crate::repeat::Repeat;

    pub fn serialize<S: Serializer>(repeat: &Repeat, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&serialize_repeat(repeat))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Repeat, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_repeat(&text).ok_or_else(|| D::Error::custom(format!("unrecognised repeat `{text}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn parses_periodic_intervals() {
        let repeat = parse_repeat("every 3 days").unwrap();
        assert_eq!(repeat.strategy, Strategy::Periodic);
        assert_eq!((repeat.period, repeat.period_unit), (3, PeriodUnit::Day));
        assert_eq!(repeat.time_of_day, TimeOfDay::Am);

        let repeat = parse_repeat("Every Year").unwrap();
        assert_eq!((repeat.period, repeat.period_unit), (1, PeriodUnit::Year));

        let repeat = parse_repeat("every 2 weeks in the evening").unwrap();
        assert_eq!((repeat.period, repeat.period_unit), (14, PeriodUnit::Day));
        assert_eq!(repeat.time_of_day, TimeOfDay::Pm);
    }

    #[test]
    fn parses_spaced_intervals() {
        let repeat = parse_repeat("spaced every 12 hours in the evening").unwrap();
        assert_eq!(repeat.strategy, Strategy::Spaced);
        assert_eq!((repeat.period, repeat.period_unit), (12, PeriodUnit::Hour));
        assert_eq!(repeat.time_of_day, TimeOfDay::Pm);

        let repeat = parse_repeat("spaced every 1 month in the morning").unwrap();
        assert_eq!(repeat.time_of_day, TimeOfDay::Am);
        assert_eq!(repeat.period_unit, PeriodUnit::Month);
    }

    #[test]
    fn parses_weekday_lists() {
        let repeat = parse_repeat("every Thursday, tuesday").unwrap();
        assert_eq!(repeat.period_unit, PeriodUnit::Weekdays);
        assert_eq!(repeat.weekdays, vec![Weekday::Tue, Weekday::Thu]);

        let repeat = parse_repeat("spaced every mon and fri in the evening").unwrap();
        assert_eq!(repeat.strategy, Strategy::Spaced);
        assert_eq!(repeat.weekdays, vec![Weekday::Mon, Weekday::Fri]);
        assert_eq!(repeat.time_of_day, TimeOfDay::Pm);
    }

    #[test]
    fn rejects_unparseable_text() {
        for text in [
            "",
            "sometimes",
            "every",
            "every 0 days",
            "every 3 fortnights",
            "every -1 days",
            "every 2 days please",
            "spaced",
            "never again",
            "every tuesday and someday",
            "every in the evening",
        ] {
            assert_eq!(parse_repeat(text), None, "`{text}` should not parse");
        }
    }

    #[test]
    fn serializes_without_renormalizing() {
        let hours = Repeat::new(Strategy::Spaced, 24, PeriodUnit::Hour, TimeOfDay::Am);
        assert_eq!(serialize_repeat(&hours), "spaced every 24 hours");

        let day = Repeat::new(Strategy::Spaced, 1, PeriodUnit::Day, TimeOfDay::Am);
        assert_eq!(serialize_repeat(&day), "spaced every 1 day");

        let weekdays =
            Repeat::on_weekdays(Strategy::Periodic, [Weekday::Thu, Weekday::Tue], TimeOfDay::Pm);
        assert_eq!(
            serialize_repeat(&weekdays),
            "every tuesday, thursday in the evening"
        );
        assert_eq!(serialize_repeat(&Repeat::never()), "never");
    }

    #[test]
    fn serialized_text_round_trips() {
        for text in [
            "never",
            "every 1 hour",
            "every 3 days",
            "every 2 months in the evening",
            "every 1 year",
            "spaced every 24 hours",
            "spaced every 1 day",
            "spaced every 12 hours in the evening",
            "every monday",
            "every tuesday, thursday, sunday in the evening",
            "spaced every saturday",
        ] {
            let repeat = parse_repeat(text).unwrap();
            assert_eq!(serialize_repeat(&repeat), text);
            assert_eq!(parse_repeat(&serialize_repeat(&repeat)), Some(repeat));
        }
    }

    #[test]
    fn repetition_fields_round_trip() {
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        let repetition = Repetition {
            repeat: parse_repeat("spaced every 12 hours in the evening").unwrap(),
            due_at: Some(offset.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap()),
            hidden: true,
            is_virtual: false,
        };
        let stored = serialize_repetition(&repetition);
        assert_eq!(stored.repeat, "spaced every 12 hours in the evening");
        assert_eq!(stored.due_at.as_deref(), Some("2024-01-01T18:00:00-05:00"));
        assert_eq!(stored.hidden, Some(true));
        assert_eq!(deserialize_repetition(&stored, utc()), Some(repetition));
    }

    #[test]
    fn unscheduled_repetition_omits_optional_keys() {
        let repetition = parse_repetition("every 2 days").unwrap();
        let stored = serialize_repetition(&repetition);
        assert_eq!(stored.due_at, None);
        assert_eq!(stored.hidden, None);
        assert!(parse_repetition("whenever").is_none());
    }

    #[test]
    fn zone_less_due_dates_use_supplied_offset() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let due = parse_due_at("2024-01-02T06:00", offset).unwrap();
        assert_eq!(format_due_at(&due), "2024-01-02T06:00:00+01:00");
        let due = parse_due_at("2024-01-02", offset).unwrap();
        assert_eq!(format_due_at(&due), "2024-01-02T00:00:00+01:00");
        assert!(parse_due_at("soon", offset).is_none());
    }

    #[test]
    fn repeat_text_serde_adapter() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            #[serde(with = "repeat_text")]
            repeat: Repeat,
        }
        let holder: Holder = serde_json::from_str(r#"{ "repeat": "every 2 days" }"#).unwrap();
        assert_eq!(holder.repeat.period, 2);
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"repeat":"every 2 days"}"#);
        assert!(serde_json::from_str::<Holder>(r#"{ "repeat": "often" }"#).is_err());
    }
}
