//! Keystroke policy — `send(window, text)` (SPEC_FULL.md §4.3.4). Text
//! classification and key encoding into a step list for the muxer to play
//! back.

use regex::Regex;
use std::sync::LazyLock;

/// Which [`crate::timing::Timing`] knob a [`Step::Sleep`] draws its duration
/// from — distinct steps in the same plan can need different waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepKind {
    /// Gap between successive `Down` keystrokes while selecting an option.
    DownKeyGap,
    /// Wait after `Tab` opens the amendment input box.
    AmendmentOpen,
    /// Wait after the amendment instructions are typed, before `Enter`.
    AmendmentSubmit,
    /// Gap between the two `Enter` presses after a free-text send.
    DoubleEnterGap,
}

/// A single encoded action: either literal text or a named key, with an
/// optional pause after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Literal(String),
    Key(&'static str),
    Sleep(SleepKind),
}

/// The classification of an inbound text, per SPEC_FULL.md §4.3.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A numbered/yes/no option followed by free-text amendment
    /// instructions, e.g. `"2 please use the other approach"`.
    OptionWithInstructions { option: u8, instructions: String },
    /// A bare digit 1-9 or yes/y/no/n.
    SimpleOption { option: u8 },
    FreeText,
}

static OPTION_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[1-9]\.?\s+(.+)$").unwrap());
static OPTION_YES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:yes|y)\s+(.+)$").unwrap());
static OPTION_NO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:no|n)\s+(.+)$").unwrap());
static SIMPLE_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9]$").unwrap());

/// Classify a trimmed inbound text per the rules in SPEC_FULL.md §4.3.4.
pub fn classify(text: &str) -> Classification {
    let trimmed = text.trim();

    if let Some(caps) = OPTION_NUMERIC.captures(trimmed) {
        let digit = trimmed.chars().next().and_then(|c| c.to_digit(10)).unwrap_or(1) as u8;
        return Classification::OptionWithInstructions {
            option: digit,
            instructions: caps[1].to_owned(),
        };
    }
    if let Some(caps) = OPTION_YES.captures(trimmed) {
        return Classification::OptionWithInstructions { option: 1, instructions: caps[1].to_owned() };
    }
    if let Some(caps) = OPTION_NO.captures(trimmed) {
        return Classification::OptionWithInstructions { option: 3, instructions: caps[1].to_owned() };
    }

    if SIMPLE_DIGIT.is_match(trimmed) {
        let digit = trimmed.chars().next().and_then(|c| c.to_digit(10)).unwrap_or(1) as u8;
        return Classification::SimpleOption { option: digit };
    }
    if trimmed.eq_ignore_ascii_case("yes") || trimmed.eq_ignore_ascii_case("y") {
        return Classification::SimpleOption { option: 1 };
    }
    if trimmed.eq_ignore_ascii_case("no") || trimmed.eq_ignore_ascii_case("n") {
        return Classification::SimpleOption { option: 3 };
    }

    Classification::FreeText
}

/// True if `text` classifies as *some* option selection (simple or with
/// instructions) — used by the injection procedure (§4.3.3 step 3) to
/// decide whether the `pendingPermission` rewrite-to-reject applies.
pub fn is_option_selection(text: &str) -> bool {
    !matches!(classify(text), Classification::FreeText)
}

/// True if the text is exactly a plain rejection option (`"3"`, `"n"`,
/// `"no"`) — used by the injection procedure's rejection-cleanup step
/// (§4.3.3 step 4).
pub fn is_plain_rejection(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == "3" || trimmed.eq_ignore_ascii_case("n") || trimmed.eq_ignore_ascii_case("no")
}

/// Build the ordered step list for `send(window, text)` (without the
/// per-step sleeps, which the caller fills in from a [`crate::timing::Timing`]
/// instance so tests can zero them).
pub fn plan(text: &str) -> Vec<Step> {
    match classify(text) {
        Classification::OptionWithInstructions { option, instructions } => {
            let mut steps = Vec::new();
            for _ in 0..option.saturating_sub(1) {
                steps.push(Step::Key("down"));
                steps.push(Step::Sleep(SleepKind::DownKeyGap));
            }
            steps.push(Step::Key("tab"));
            steps.push(Step::Sleep(SleepKind::AmendmentOpen));
            steps.push(Step::Literal(instructions));
            steps.push(Step::Sleep(SleepKind::AmendmentSubmit));
            steps.push(Step::Key("enter"));
            steps
        }
        Classification::SimpleOption { option } => vec![Step::Literal(option.to_string())],
        Classification::FreeText => vec![
            Step::Literal(text.to_owned()),
            Step::Key("enter"),
            Step::Sleep(SleepKind::DoubleEnterGap),
            Step::Key("enter"),
        ],
    }
}

#[cfg(test)]
#[path = "keystroke_tests.rs"]
mod tests;
