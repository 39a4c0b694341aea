use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use repeat_core::{
    codec::format_due_at, get_repeat_choices, parse_repeat, repetition_from_markdown,
    serialize_repeat, update_repetition_metadata, Clock, FixedClock, RawConfig, RepeatChoice,
    Repetition, ReviewConfig, ScheduleState, SystemClock,
};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "repeat-review")]
#[command(about = "Review scheduler for markdown notes with a `repeat` frontmatter key")]
#[command(version)]
pub struct Cli {
    /// JSON review settings. Environment overrides still apply.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretend the current instant is this RFC 3339 timestamp
    #[arg(long, global = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the review choices for a note
    Choices {
        /// Markdown note
        note: PathBuf,
    },
    /// Apply a review choice and rewrite the note's frontmatter
    Choose {
        /// Markdown note
        note: PathBuf,
        /// 1-based choice number as printed by `choices`
        index: usize,
    },
    /// Show how a repeat value is understood
    Parse {
        /// Repeat text, e.g. "spaced every 2 days in the evening"
        text: String,
    },
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    run_with_env(cli, |key| std::env::var(key).ok(), out)
}

/// Same as [`run`] with `REPEAT_*` overrides read through `env`.
pub fn run_with_env(
    cli: Cli,
    env: impl Fn(&str) -> Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let config = load_config(cli.config.as_deref(), env)?;
    let clock = build_clock(cli.now.as_deref())?;

    match cli.command {
        Commands::Choices { note } => print_choices(&note, &config, clock.as_ref(), out),
        Commands::Choose { note, index } => choose(&note, index, &config, clock.as_ref(), out),
        Commands::Parse { text } => print_parsed(&text, out),
    }
}

fn load_config(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<ReviewConfig> {
    let mut raw = match path {
        Some(path) => RawConfig::load(path)
            .with_context(|| format!("loading review settings from {}", path.display()))?,
        None => RawConfig::default(),
    };
    raw.apply_overrides(env);
    let config = match path {
        Some(path) => raw
            .into_config()
            .with_context(|| format!("validating review settings from {}", path.display()))?,
        None => raw
            .into_config()
            .context("reading review settings from environment")?,
    };
    Ok(config)
}

fn build_clock(now: Option<&str>) -> Result<Box<dyn Clock>> {
    match now {
        Some(text) => {
            let now = DateTime::parse_from_rfc3339(text.trim())
                .with_context(|| format!("`{text}` is not an RFC 3339 timestamp"))?;
            debug!(%now, "using fixed clock");
            Ok(Box::new(FixedClock::new(now)))
        }
        None => Ok(Box::new(SystemClock)),
    }
}

fn read_note(
    note: &Path,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Result<(String, Option<Repetition>)> {
    let markdown =
        fs::read_to_string(note).with_context(|| format!("reading note {}", note.display()))?;
    let repetition = repetition_from_markdown(&markdown, config, clock.now());
    Ok((markdown, repetition))
}

fn due_choices(
    note: &Path,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Result<Option<(String, Vec<RepeatChoice>)>> {
    let (markdown, repetition) = read_note(note, config, clock)?;
    let Some(repetition) = repetition else {
        return Ok(None);
    };
    if repetition.state(clock) == ScheduleState::ScheduledNotDue {
        return Ok(None);
    }
    let choices = get_repeat_choices(&repetition, config, clock);
    Ok(Some((markdown, choices)))
}

fn print_choices(
    note: &Path,
    config: &ReviewConfig,
    clock: &dyn Clock,
    out: &mut impl Write,
) -> Result<()> {
    let Some((_, choices)) = due_choices(note, config, clock)? else {
        writeln!(out, "{} is not due for review", note.display())?;
        return Ok(());
    };
    for (number, choice) in choices.iter().enumerate() {
        let number = number + 1;
        match choice.repetition().and_then(|next| next.due_at) {
            Some(due_at) => writeln!(out, "{number}. {} -> {}", choice.text, format_due_at(&due_at))?,
            None => writeln!(out, "{number}. {}", choice.text)?,
        }
    }
    Ok(())
}

fn choose(
    note: &Path,
    index: usize,
    config: &ReviewConfig,
    clock: &dyn Clock,
    out: &mut impl Write,
) -> Result<()> {
    let Some((markdown, choices)) = due_choices(note, config, clock)? else {
        bail!("{} is not due for review", note.display());
    };
    let Some(choice) = index.checked_sub(1).and_then(|position| choices.get(position)) else {
        bail!("choice {index} is out of range, expected 1 to {}", choices.len());
    };

    match choice.next_repetition.serialize() {
        Some(update) => {
            fs::write(note, update_repetition_metadata(&markdown, &update))
                .with_context(|| format!("writing note {}", note.display()))?;
            info!(
                note = %note.display(),
                repeat = %update.repeat,
                due_at = ?update.due_at,
                "rescheduled note"
            );
            let outcome = update.due_at.as_deref().unwrap_or(&update.repeat);
            writeln!(out, "{}: {outcome}", choice.text)?;
        }
        None => writeln!(out, "{}: note left unchanged", choice.text)?,
    }
    Ok(())
}

fn print_parsed(text: &str, out: &mut impl Write) -> Result<()> {
    let Some(repeat) = parse_repeat(text) else {
        bail!("`{text}` is not a recognised repeat value");
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&repeat)?)?;
    writeln!(out, "{}", serialize_repeat(&repeat))?;
    Ok(())
}
