use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    codec,
    error::{ConfigError, ConfigResult},
    repeat::{PeriodUnit, Repeat, Strategy, TimeOfDay},
    time_of_day::ReviewTime,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "m")]
    Minute,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
}

impl IntervalUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            IntervalUnit::Second => "s",
            IntervalUnit::Minute => "m",
            IntervalUnit::Hour => "h",
            IntervalUnit::Day => "d",
        }
    }

    /// `None` when the amount does not fit a [`Duration`].
    pub fn duration(self, amount: u32) -> Option<Duration> {
        let amount = i64::from(amount);
        match self {
            IntervalUnit::Second => Duration::try_seconds(amount),
            IntervalUnit::Minute => Duration::try_minutes(amount),
            IntervalUnit::Hour => Duration::try_hours(amount),
            IntervalUnit::Day => Duration::try_days(amount),
        }
    }
}

/// Presentation hint carried through to the rendered choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonColor {
    Red,
    Orange,
    Green,
    Blue,
    Purple,
    Cyan,
    #[default]
    Gray,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomIntervalButton {
    pub amount: u32,
    pub unit: IntervalUnit,
    pub label: String,
    #[serde(default)]
    pub color: ButtonColor,
}

impl CustomIntervalButton {
    pub fn new(amount: u32, unit: IntervalUnit, label: impl Into<String>, color: ButtonColor) -> Self {
        Self {
            amount,
            unit,
            label: label.into(),
            color,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.unit.duration(self.amount)
    }

    pub fn text(&self) -> String {
        format!("{}{} {}", self.amount, self.unit.suffix(), self.label)
    }
}

fn default_buttons() -> Vec<CustomIntervalButton> {
    vec![
        CustomIntervalButton::new(10, IntervalUnit::Second, "again", ButtonColor::Red),
        CustomIntervalButton::new(10, IntervalUnit::Minute, "easy", ButtonColor::Blue),
        CustomIntervalButton::new(1, IntervalUnit::Day, "good", ButtonColor::Green),
        CustomIntervalButton::new(2, IntervalUnit::Day, "mastered", ButtonColor::Orange),
    ]
}

fn default_repeat() -> Repeat {
    Repeat::new(Strategy::Spaced, 1, PeriodUnit::Day, TimeOfDay::Am)
}

/// On-disk shape of the configuration. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawConfig {
    #[serde(alias = "morningReviewTime")]
    pub morning_review_time: String,
    #[serde(alias = "eveningReviewTime")]
    pub evening_review_time: String,
    #[serde(alias = "defaultRepeat")]
    pub default_repeat: String,
    #[serde(alias = "enqueueNonRepeatingNotes")]
    pub enqueue_non_repeating_notes: bool,
    #[serde(alias = "useCustomIntervals")]
    pub use_custom_intervals: bool,
    #[serde(alias = "customIntervalButtons")]
    pub custom_interval_buttons: Vec<CustomIntervalButton>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            morning_review_time: ReviewTime::DEFAULT_MORNING.to_string(),
            evening_review_time: ReviewTime::DEFAULT_EVENING.to_string(),
            default_repeat: codec::serialize_repeat(&default_repeat()),
            enqueue_non_repeating_notes: false,
            use_custom_intervals: false,
            custom_interval_buttons: default_buttons(),
        }
    }
}

impl RawConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loading review configuration");
        Self::from_json_str(&json)
    }

    /// Applies `REPEAT_*` environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`RawConfig::apply_env`] with an explicit variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("REPEAT_MORNING_TIME") {
            self.morning_review_time = value.trim().to_string();
        }
        if let Some(value) = lookup("REPEAT_EVENING_TIME") {
            self.evening_review_time = value.trim().to_string();
        }
        if let Some(value) = lookup("REPEAT_DEFAULT_REPEAT") {
            self.default_repeat = value.trim().to_string();
        }
        if let Some(flag) = lookup("REPEAT_ENQUEUE_NON_REPEATING").and_then(|v| parse_flag(&v)) {
            self.enqueue_non_repeating_notes = flag;
        }
        if let Some(flag) = lookup("REPEAT_USE_CUSTOM_INTERVALS").and_then(|v| parse_flag(&v)) {
            self.use_custom_intervals = flag;
        }
    }

    pub fn into_config(self) -> ConfigResult<ReviewConfig> {
        ReviewConfig::try_from(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validated configuration snapshot consumed by the scheduling functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    morning_review_time: ReviewTime,
    evening_review_time: ReviewTime,
    default_repeat: Repeat,
    enqueue_non_repeating_notes: bool,
    use_custom_intervals: bool,
    custom_interval_buttons: Vec<CustomIntervalButton>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            morning_review_time: ReviewTime::DEFAULT_MORNING,
            evening_review_time: ReviewTime::DEFAULT_EVENING,
            default_repeat: default_repeat(),
            enqueue_non_repeating_notes: false,
            use_custom_intervals: false,
            custom_interval_buttons: default_buttons(),
        }
    }
}

impl ReviewConfig {
    /// Reads a JSON file and layers environment overrides on top.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut raw = RawConfig::load(path)?;
        raw.apply_env();
        raw.into_config()
    }

    pub fn from_env() -> ConfigResult<Self> {
        let mut raw = RawConfig::default();
        raw.apply_env();
        raw.into_config()
    }

    pub fn morning_review_time(&self) -> ReviewTime {
        self.morning_review_time
    }

    pub fn evening_review_time(&self) -> ReviewTime {
        self.evening_review_time
    }

    pub fn default_repeat(&self) -> &Repeat {
        &self.default_repeat
    }

    pub fn enqueue_non_repeating_notes(&self) -> bool {
        self.enqueue_non_repeating_notes
    }

    pub fn use_custom_intervals(&self) -> bool {
        self.use_custom_intervals
    }

    pub fn custom_interval_buttons(&self) -> &[CustomIntervalButton] {
        &self.custom_interval_buttons
    }

    /// Buttons that replace the multiplier choices, if that mode is active.
    pub fn active_custom_buttons(&self) -> Option<&[CustomIntervalButton]> {
        (self.use_custom_intervals && !self.custom_interval_buttons.is_empty())
            .then_some(self.custom_interval_buttons.as_slice())
    }
}

impl TryFrom<RawConfig> for ReviewConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> ConfigResult<Self> {
        let morning = parse_review_time("morning_review_time", &raw.morning_review_time)?;
        let evening = parse_review_time("evening_review_time", &raw.evening_review_time)?;
        let default_repeat = codec::parse_repeat(&raw.default_repeat)
            .filter(|repeat| !repeat.is_never())
            .ok_or_else(|| ConfigError::InvalidDefaultRepeat(raw.default_repeat.clone()))?;
        validate_buttons(&raw.custom_interval_buttons)?;

        let config = Self {
            morning_review_time: morning.clamp_morning(),
            evening_review_time: evening.clamp_evening(),
            default_repeat,
            enqueue_non_repeating_notes: raw.enqueue_non_repeating_notes,
            use_custom_intervals: raw.use_custom_intervals,
            custom_interval_buttons: raw.custom_interval_buttons,
        };
        if config.morning_review_time != morning || config.evening_review_time != evening {
            debug!(
                morning = %config.morning_review_time,
                evening = %config.evening_review_time,
                "clamped review times"
            );
        }
        Ok(config)
    }
}

fn parse_review_time(field: &'static str, value: &str) -> ConfigResult<ReviewTime> {
    ReviewTime::parse(value).ok_or_else(|| ConfigError::InvalidReviewTime {
        field,
        value: value.to_string(),
    })
}

/// Longest interval a custom button may schedule ahead.
pub const MAX_CUSTOM_INTERVAL_DAYS: i64 = 36_500;

fn validate_buttons(buttons: &[CustomIntervalButton]) -> ConfigResult<()> {
    for (index, button) in buttons.iter().enumerate() {
        if button.amount == 0 {
            return Err(ConfigError::NonPositiveInterval { index: index + 1 });
        }
        let within_range = button
            .interval()
            .is_some_and(|interval| interval.num_days() <= MAX_CUSTOM_INTERVAL_DAYS);
        if !within_range {
            return Err(ConfigError::IntervalTooLong {
                index: index + 1,
                max_days: MAX_CUSTOM_INTERVAL_DAYS,
            });
        }
        if index > 0 && button.interval() <= buttons[index - 1].interval() {
            return Err(ConfigError::IntervalOrder {
                index: index + 1,
                previous: index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_raw_defaults() {
        let config = RawConfig::default().into_config().unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.morning_review_time().to_string(), "06:00");
        assert_eq!(config.evening_review_time().to_string(), "18:00");
        assert_eq!(config.custom_interval_buttons().len(), 4);
        assert!(config.active_custom_buttons().is_none());
    }

    #[test]
    fn review_times_are_clamped() {
        let raw = RawConfig {
            morning_review_time: "13:30".into(),
            evening_review_time: "08:00".into(),
            ..RawConfig::default()
        };
        let config = raw.into_config().unwrap();
        assert_eq!(config.morning_review_time(), ReviewTime::LAST_MORNING_MINUTE);
        assert_eq!(config.evening_review_time(), ReviewTime::NOON);
    }

    #[test]
    fn malformed_review_time_is_rejected() {
        let raw = RawConfig {
            morning_review_time: "early".into(),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.into_config(),
            Err(ConfigError::InvalidReviewTime {
                field: "morning_review_time",
                ..
            })
        ));
    }

    #[test]
    fn buttons_must_strictly_increase() {
        let raw = RawConfig {
            custom_interval_buttons: vec![
                CustomIntervalButton::new(1, IntervalUnit::Hour, "soon", ButtonColor::Red),
                CustomIntervalButton::new(60, IntervalUnit::Minute, "same", ButtonColor::Blue),
            ],
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.into_config(),
            Err(ConfigError::IntervalOrder {
                index: 2,
                previous: 1
            })
        ));

        let raw = RawConfig {
            custom_interval_buttons: vec![CustomIntervalButton::new(
                0,
                IntervalUnit::Day,
                "zero",
                ButtonColor::Gray,
            )],
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.into_config(),
            Err(ConfigError::NonPositiveInterval { index: 1 })
        ));
    }

    #[test]
    fn oversized_button_intervals_are_rejected() {
        let json = r#"{"customIntervalButtons": [
            {"amount": 1, "unit": "d", "label": "good"},
            {"amount": 100000000, "unit": "d", "label": "forever"}
        ]}"#;
        let raw = RawConfig::from_json_str(json).unwrap();
        assert!(matches!(
            raw.into_config(),
            Err(ConfigError::IntervalTooLong { index: 2, .. })
        ));

        let seconds = RawConfig {
            custom_interval_buttons: vec![CustomIntervalButton::new(
                u32::MAX,
                IntervalUnit::Second,
                "long",
                ButtonColor::Gray,
            )],
            ..RawConfig::default()
        };
        assert!(matches!(
            seconds.into_config(),
            Err(ConfigError::IntervalTooLong { index: 1, .. })
        ));

        assert_eq!(IntervalUnit::Day.duration(u32::MAX), None);
    }

    #[test]
    fn parses_json_with_settings_aliases() {
        let json = r#"{
            "morningReviewTime": "07:15",
            "defaultRepeat": "every 2 days in the evening",
            "useCustomIntervals": true,
            "customIntervalButtons": [
                { "amount": 30, "unit": "s", "label": "now", "color": "red" },
                { "amount": 2, "unit": "h", "label": "later" }
            ]
        }"#;
        let config = RawConfig::from_json_str(json).unwrap().into_config().unwrap();
        assert_eq!(config.morning_review_time(), ReviewTime::new(7, 15).unwrap());
        assert_eq!(config.evening_review_time(), ReviewTime::new(18, 0).unwrap());
        assert_eq!(config.default_repeat().period, 2);
        assert_eq!(config.default_repeat().time_of_day, TimeOfDay::Pm);
        let buttons = config.active_custom_buttons().expect("custom buttons active");
        assert_eq!(buttons[0].text(), "30s now");
        assert_eq!(buttons[1].color, ButtonColor::Gray);
        assert_eq!(buttons[1].interval(), Some(Duration::hours(2)));
    }

    #[test]
    fn never_is_not_a_default_repeat() {
        let raw = RawConfig {
            default_repeat: "never".into(),
            ..RawConfig::default()
        };
        assert!(matches!(
            raw.into_config(),
            Err(ConfigError::InvalidDefaultRepeat(_))
        ));
    }

    #[test]
    fn environment_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("REPEAT_EVENING_TIME", " 20:30 "),
            ("REPEAT_ENQUEUE_NON_REPEATING", "yes"),
            ("REPEAT_USE_CUSTOM_INTERVALS", "maybe"),
        ]);
        let mut raw = RawConfig::default();
        raw.apply_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(raw.evening_review_time, "20:30");
        assert!(raw.enqueue_non_repeating_notes);
        assert!(!raw.use_custom_intervals);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ReviewConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let present = dir.path().join("config.json");
        fs::write(&present, r#"{ "enqueue_non_repeating_notes": true }"#).expect("write config");
        let raw = RawConfig::load(&present).unwrap();
        assert!(raw.enqueue_non_repeating_notes);
        assert_eq!(raw.morning_review_time, "06:00");
    }
}
