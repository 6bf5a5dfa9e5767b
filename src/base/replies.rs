//! User-facing reply texts.

use chrono::{Local, TimeDelta};

/// Reply to `/start`.
pub const START_TEXT: &str = r#"Hi! I am a pomodoro bot. I ring when your timers run out.

/set - start a timer with the default duration
/set <mins> - start a timer for <mins> minutes
/set <mins> <notice> - same, and ring with <notice>
/unset - stop the most recently set timer
/unset <mins> - stop the oldest <mins> minutes timer
/unset all - stop every timer
/help - show this message"#;

/// Reply to `/help`.
pub const HELP_TEXT: &str = r#"Commands:

/set - start a timer with the default duration
/set <mins> - start a timer for <mins> minutes
/set <mins> <notice> - same, and ring with <notice>
/unset - stop the most recently set timer
/unset <mins> - stop the oldest <mins> minutes timer
/unset all - stop every timer"#;

/// Reply to `/unset all`.
pub const ALL_UNSET_TEXT: &str = "All timers are unset.";

/// Reply to anything the classifier did not recognize.
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command.";

/// Reply to a successful set, e.g. `Timer set for 25 mins (ring at 14:03:11).`
///
/// `notice` is only rendered when the user supplied a custom one.
pub fn timer_set(minutes: u32, notice: Option<&str>) -> String {
    let ring_at = TimeDelta::try_minutes(i64::from(minutes))
        .and_then(|delta| Local::now().checked_add_signed(delta))
        .map(|ring_at| ring_at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "??:??:??".to_string());

    match notice {
        Some(notice) => format!("Timer set for {minutes} mins (ring at {ring_at}, notice: \"{notice}\")."),
        None => format!("Timer set for {minutes} mins (ring at {ring_at})."),
    }
}

/// Reply to a successful unset.
pub fn timer_unset(minutes: u32) -> String {
    format!("{minutes} mins timer is unset.")
}

/// Renders an error as a sentence: capitalized, with a trailing period.
pub fn pretty_error(err: &dyn std::error::Error) -> String {
    let message = err.to_string();
    let mut chars = message.chars();

    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => message,
    }
}

// Tests.
