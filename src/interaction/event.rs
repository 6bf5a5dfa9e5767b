//! Classification of raw command text into typed events.

const START: &str = "/start";
const HELP: &str = "/help";
const SET: &str = "/set";
const UNSET: &str = "/unset";
const ALL: &str = "all";

/// What a command asks for, with the arguments it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Help,
    /// `/set`, with the configured duration and notice.
    SetDefault,
    /// `/set <mins>`, with the configured notice.
    SetTime { minutes: u32 },
    /// `/set <mins> <notice...>`.
    SetTimeAndNotice { minutes: u32, notice: String },
    /// `/unset`, cancels the most recent timer.
    Unset,
    /// `/unset <mins>`, cancels the oldest timer with that duration.
    UnsetByDuration { minutes: u32 },
    /// `/unset all`.
    UnsetAll,
    Unrecognized,
}

/// One classified inbound command, addressed to the chat it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub chat_id: i64,
    pub kind: EventKind,
}

impl Event {
    /// Classifies `text` and addresses the result to `chat_id`.
    pub fn new(chat_id: i64, text: &str) -> Self {
        Self { chat_id, kind: classify(text) }
    }
}

/// Maps raw command text to an event kind.
///
/// Never fails: anything outside the grammar is [`EventKind::Unrecognized`].
pub fn classify(text: &str) -> EventKind {
    match text {
        START => EventKind::Start,
        HELP => EventKind::Help,
        _ => classify_set(text).or_else(|| classify_unset(text)).unwrap_or(EventKind::Unrecognized),
    }
}

/// `/set [mins [notice...]]`
fn classify_set(text: &str) -> Option<EventKind> {
    if text.len() < SET.len() {
        return None;
    }

    let mut words = text.split(' ');

    if words.next()? != SET {
        return None;
    }

    let Some(minutes) = words.next() else {
        return Some(EventKind::SetDefault);
    };

    let minutes = parse_minutes(minutes)?;
    let notice = words.collect::<Vec<_>>().join(" ");

    // Only separators after the duration (e.g. a trailing space) mean no notice.
    if notice.trim().is_empty() {
        Some(EventKind::SetTime { minutes })
    } else {
        Some(EventKind::SetTimeAndNotice { minutes, notice })
    }
}

/// `/unset [mins | all]`
fn classify_unset(text: &str) -> Option<EventKind> {
    if text.len() < UNSET.len() {
        return None;
    }

    let words: Vec<&str> = text.split(' ').collect();

    match words.as_slice() {
        [UNSET] => Some(EventKind::Unset),
        [UNSET, arg] if arg.eq_ignore_ascii_case(ALL) => Some(EventKind::UnsetAll),
        [UNSET, arg] => parse_minutes(arg).map(|minutes| EventKind::UnsetByDuration { minutes }),
        _ => None,
    }
}

/// A strictly positive number of minutes.
fn parse_minutes(word: &str) -> Option<u32> {
    word.parse::<u32>().ok().filter(|&minutes| minutes > 0)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_commands() {
        assert_eq!(classify("/start"), EventKind::Start);
        assert_eq!(classify("/help"), EventKind::Help);
        assert_eq!(classify("/start now"), EventKind::Unrecognized);
        assert_eq!(classify("/HELP"), EventKind::Unrecognized);
    }

    #[test]
    fn set_grammar() {
        assert_eq!(classify("/set"), EventKind::SetDefault);
        assert_eq!(classify("/set 10"), EventKind::SetTime { minutes: 10 });
        assert_eq!(
            classify("/set 1 Stretch!"),
            EventKind::SetTimeAndNotice {
                minutes: 1,
                notice: "Stretch!".to_string()
            }
        );
    }

    #[test]
    fn set_notice_is_rejoined_with_single_spaces() {
        let cases = [
            ("/set 5 take a break", "take a break"),
            ("/set 25 drink  water", "drink  water"),
            ("/set 3 a b c d e", "a b c d e"),
        ];

        for (text, notice) in cases {
            assert_eq!(
                classify(text),
                EventKind::SetTimeAndNotice {
                    minutes: text.split(' ').nth(1).unwrap().parse().unwrap(),
                    notice: notice.to_string()
                },
                "{text}"
            );
        }
    }

    #[test]
    fn set_with_trailing_space_has_no_notice() {
        assert_eq!(classify("/set 5 "), EventKind::SetTime { minutes: 5 });
    }

    #[test]
    fn set_rejects_bad_durations() {
        for text in ["/set abc", "/set 0", "/set -5", "/set 5.5 x", "/set  5", "/set 99999999999"] {
            assert_eq!(classify(text), EventKind::Unrecognized, "{text}");
        }
    }

    #[test]
    fn unset_grammar() {
        assert_eq!(classify("/unset"), EventKind::Unset);
        assert_eq!(classify("/unset all"), EventKind::UnsetAll);
        assert_eq!(classify("/unset ALL"), EventKind::UnsetAll);
        assert_eq!(classify("/unset aLl"), EventKind::UnsetAll);
        assert_eq!(classify("/unset 25"), EventKind::UnsetByDuration { minutes: 25 });
    }

    #[test]
    fn unset_rejects_other_shapes() {
        for text in ["/unset 25 now", "/unset all now", "/unset x", "/unset 0", "/unset "] {
            assert_eq!(classify(text), EventKind::Unrecognized, "{text}");
        }
    }

    #[test]
    fn everything_else_is_unrecognized() {
        for text in ["", " ", "/", "/s", "hello", "/settings", "/unsetall", " /set", "set 5", "/stop"] {
            assert_eq!(classify(text), EventKind::Unrecognized, "{text:?}");
        }
    }

    #[test]
    fn event_carries_chat_id() {
        let event = Event::new(42, "/unset");

        assert_eq!(event.chat_id, 42);
        assert_eq!(event.kind, EventKind::Unset);
    }
}
