use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::{
    codec::{parse_due_at, parse_repeat, SerializedRepetition},
    config::ReviewConfig,
    repeat::Repetition,
};

const DELIMITER: &str = "---";
const REPEAT_KEY: &str = "repeat";
const DUE_AT_KEY: &str = "due_at";
const HIDDEN_KEY: &str = "hidden";

/// Scheduling keys read from a note's YAML frontmatter. Other keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteMetadata {
    #[serde(deserialize_with = "scalar_text")]
    pub repeat: Option<String>,
    #[serde(deserialize_with = "scalar_text")]
    pub due_at: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub hidden: Option<bool>,
}

/// Any scalar as text, so `repeat: 2024` or an unquoted timestamp still reads.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let text = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => return Ok(None),
    };
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// YAML booleans plus the `yes`/`on` spellings notes tend to use.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(value)) => Some(value),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

struct Frontmatter<'a> {
    lines: Vec<&'a str>,
    body: &'a str,
}

fn split_frontmatter(markdown: &str) -> Option<Frontmatter<'_>> {
    let mut segments = markdown.split_inclusive('\n');
    let first = segments.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }
    let mut consumed = first.len();
    let mut lines = Vec::new();
    for segment in segments {
        consumed += segment.len();
        let line = segment.trim_end_matches(|c| c == '\n' || c == '\r');
        if line.trim_end() == DELIMITER {
            return Some(Frontmatter {
                lines,
                body: &markdown[consumed..],
            });
        }
        lines.push(line);
    }
    None
}

/// Key of a top-level `key: value` line. Indented lines belong to nested values.
fn top_level_key(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) || line.starts_with('#') {
        return None;
    }
    line.split_once(':').map(|(key, _)| key.trim())
}

pub fn read_metadata(markdown: &str) -> NoteMetadata {
    let Some(frontmatter) = split_frontmatter(markdown) else {
        return NoteMetadata::default();
    };
    let yaml = frontmatter.lines.join("\n");
    if yaml.trim().is_empty() {
        return NoteMetadata::default();
    }
    match serde_yaml::from_str(&yaml) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(%err, "ignoring unreadable frontmatter");
            NoteMetadata::default()
        }
    }
}

/// Descriptor for a note, or `None` when the note is not part of the review rotation.
///
/// Notes without a `repeat` key become virtual copies of the default repeat,
/// due at `fallback_due`, when non-repeating notes are enqueued.
pub fn repetition_from_markdown(
    markdown: &str,
    config: &ReviewConfig,
    fallback_due: DateTime<FixedOffset>,
) -> Option<Repetition> {
    let metadata = read_metadata(markdown);
    let hidden = metadata.hidden.unwrap_or(false);

    let Some(text) = metadata.repeat else {
        if !config.enqueue_non_repeating_notes() {
            return None;
        }
        return Some(Repetition {
            repeat: config.default_repeat().clone(),
            due_at: Some(fallback_due),
            hidden,
            is_virtual: true,
        });
    };

    let Some(repeat) = parse_repeat(&text) else {
        warn!(repeat = %text, "ignoring unparseable repeat value");
        return None;
    };
    let due_at = metadata
        .due_at
        .as_deref()
        .and_then(|value| parse_due_at(value, *fallback_due.offset()));
    Some(Repetition {
        repeat,
        due_at,
        hidden,
        is_virtual: false,
    })
}

/// Writes the serialized keys into the note's frontmatter, removing keys
/// whose value is `None`. Other keys and the body are kept as they were.
pub fn update_repetition_metadata(markdown: &str, update: &SerializedRepetition) -> String {
    let values = [
        (REPEAT_KEY, Some(update.repeat.clone())),
        (DUE_AT_KEY, update.due_at.clone()),
        (HIDDEN_KEY, update.hidden.map(|hidden| hidden.to_string())),
    ];

    let (mut lines, body): (Vec<String>, &str) = match split_frontmatter(markdown) {
        Some(frontmatter) => (
            frontmatter.lines.iter().map(|line| line.to_string()).collect(),
            frontmatter.body,
        ),
        None => (Vec::new(), markdown),
    };

    for (key, value) in values {
        let position = lines
            .iter()
            .position(|line| top_level_key(line) == Some(key));
        match (position, value) {
            (Some(index), Some(value)) => lines[index] = format!("{key}: {value}"),
            (None, Some(value)) => lines.push(format!("{key}: {value}")),
            (Some(index), None) => {
                lines.remove(index);
            }
            (None, None) => {}
        }
    }

    let mut output = String::with_capacity(markdown.len() + 64);
    output.push_str(DELIMITER);
    output.push('\n');
    for line in &lines {
        output.push_str(line);
        output.push('\n');
    }
    output.push_str(DELIMITER);
    output.push('\n');
    output.push_str(body);
    output
}
