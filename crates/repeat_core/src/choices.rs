use chrono::{DateTime, FixedOffset};
use tracing::{debug, instrument, warn};

use crate::{
    clock::Clock,
    config::{CustomIntervalButton, ReviewConfig},
    due::{increment_due_at, multiplier_due_dates, skip_due_at, ScaledPeriod},
    repeat::{NextRepetition, PeriodUnit, RepeatChoice, Repetition, Strategy},
    weekday::occurrence_label,
};

pub const DISMISS_BUTTON_TEXT: &str = "Dismiss";
pub const NEVER_BUTTON_TEXT: &str = "Never";
pub const SKIP_BUTTON_TEXT: &str = "Skip";

/// Offered for spaced notes when custom interval buttons are not in use.
pub const SPACED_MULTIPLIERS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// Ordered review outcomes for a due note.
///
/// Unscheduled notes only get a dismiss choice. Weekday cadences always get
/// skip plus the next allowed weekday, whatever their strategy.
#[instrument(skip_all, fields(strategy = ?repetition.repeat.strategy, unit = ?repetition.repeat.period_unit))]
pub fn get_repeat_choices(
    repetition: &Repetition,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Vec<RepeatChoice> {
    if repetition.due_at.is_none() || repetition.repeat.strategy == Strategy::None {
        return vec![RepeatChoice::new(
            DISMISS_BUTTON_TEXT,
            NextRepetition::Dismiss,
        )];
    }

    let mut choices = if repetition.repeat.period_unit == PeriodUnit::Weekdays {
        weekday_choices(repetition, config, clock)
    } else if repetition.repeat.strategy == Strategy::Periodic {
        periodic_choices(repetition, config, clock)
    } else if let Some(buttons) = config.active_custom_buttons() {
        custom_interval_choices(repetition, buttons, clock)
    } else {
        spaced_choices(repetition, config, clock)
    };

    if config.enqueue_non_repeating_notes() && repetition.is_virtual {
        choices.push(RepeatChoice::new(NEVER_BUTTON_TEXT, NextRepetition::Never));
    }
    debug!(count = choices.len(), "generated repeat choices");
    choices
}

fn skip_choice(
    repetition: &Repetition,
    clock: &dyn Clock,
    others: &[RepeatChoice],
) -> RepeatChoice {
    let taken: Vec<DateTime<FixedOffset>> = others
        .iter()
        .filter_map(|choice| choice.repetition().and_then(|next| next.due_at))
        .collect();
    let due_at = skip_due_at(&repetition.repeat, clock, &taken);
    RepeatChoice::new(
        SKIP_BUTTON_TEXT,
        NextRepetition::Repetition(repetition.rescheduled(due_at)),
    )
}

/// Skip goes first and never shares a due instant with the other choices.
fn with_skip(
    repetition: &Repetition,
    clock: &dyn Clock,
    others: Vec<RepeatChoice>,
) -> Vec<RepeatChoice> {
    let mut choices = vec![skip_choice(repetition, clock, &others)];
    choices.extend(others);
    choices
}

fn weekday_choices(
    repetition: &Repetition,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Vec<RepeatChoice> {
    let due_at = increment_due_at(&repetition.repeat, config, clock);
    let advance = RepeatChoice::new(
        occurrence_label(clock.now(), due_at),
        NextRepetition::Repetition(repetition.rescheduled(due_at)),
    );
    with_skip(repetition, clock, vec![advance])
}

fn periodic_choices(
    repetition: &Repetition,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Vec<RepeatChoice> {
    let due_at = increment_due_at(&repetition.repeat, config, clock);
    let label = ScaledPeriod::scale(&repetition.repeat, 1.0, clock.now()).to_string();
    let confirm = RepeatChoice::new(
        label,
        NextRepetition::Repetition(repetition.rescheduled(due_at)),
    );
    with_skip(repetition, clock, vec![confirm])
}

/// Each button sets the next due instant from its own interval; the stored
/// cadence is left as it was.
fn custom_interval_choices(
    repetition: &Repetition,
    buttons: &[CustomIntervalButton],
    clock: &dyn Clock,
) -> Vec<RepeatChoice> {
    let now = clock.now();
    buttons
        .iter()
        .filter_map(|button| {
            let due_at = button
                .interval()
                .and_then(|interval| now.checked_add_signed(interval));
            let Some(due_at) = due_at else {
                warn!(button = %button.text(), "custom interval overflows the calendar, skipping");
                return None;
            };
            let choice = RepeatChoice::new(
                button.text(),
                NextRepetition::Repetition(repetition.rescheduled(due_at)),
            );
            Some(choice.with_color(button.color))
        })
        .collect()
}

fn spaced_choices(
    repetition: &Repetition,
    config: &ReviewConfig,
    clock: &dyn Clock,
) -> Vec<RepeatChoice> {
    let multiplied = multiplier_due_dates(&repetition.repeat, config, clock, &SPACED_MULTIPLIERS)
        .into_iter()
        .zip(SPACED_MULTIPLIERS)
        .map(|((scaled, due_at), multiplier)| {
            RepeatChoice::new(
                format!("{scaled} (x{multiplier:.1})"),
                NextRepetition::Repetition(repetition.rescheduled(due_at)),
            )
        })
        .collect();
    with_skip(repetition, clock, multiplied)
}
