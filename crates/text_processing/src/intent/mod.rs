//! Keyword and intent detection for inbound SMS
//!
//! Everything here is a pure regex check over the raw message. Compliance
//! keywords must be the whole message (carrier rules), the rest are
//! searched anywhere in the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// =============================================================================
// COMPLIANCE KEYWORDS
// =============================================================================

/// Carrier compliance keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceKeyword {
    OptOut,
    OptIn,
    Help,
}

static OPT_OUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:stop|stopall|stop all|unsubscribe|end|quit|cancel all)$").unwrap());

static OPT_IN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:start|unstop|subscribe)$").unwrap());

static HELP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:help|info)$").unwrap());

/// Detect a compliance keyword. Surrounding whitespace and punctuation are ignored.
pub fn detect_compliance(text: &str) -> Option<ComplianceKeyword> {
    let bare = text.trim().trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    if OPT_OUT.is_match(bare) {
        Some(ComplianceKeyword::OptOut)
    } else if OPT_IN.is_match(bare) {
        Some(ComplianceKeyword::OptIn)
    } else if HELP.is_match(bare) {
        Some(ComplianceKeyword::Help)
    } else {
        None
    }
}

// =============================================================================
// BOOKING COMMANDS
// =============================================================================

/// Explicit command that bypasses slot filling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// "confirm" / "C", optionally naming a proposal id
    Confirm { proposal_id: Option<String> },
    /// Bare "cancel": abandon the in-progress request
    CancelRequest,
    /// "cancel my appointment": cancel an existing booking
    CancelBooking,
    /// "reschedule my appointment"
    Reschedule,
}

static CONFIRM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:c|confirm|confirmed|yes,?\s+confirm)(?:\s+(p-[0-9a-f]{6}))?(?:\s+please)?\s*[.!]*\s*$")
        .unwrap()
});

static CANCEL_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:cancel|cancel that|cancel it|never\s*mind|forget it)\s*[.!]*\s*$").unwrap()
});

static CANCEL_BOOKING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:cancel|call off)\b.*\b(?:appointment|appt|booking|reservation)s?\b").unwrap()
});

static RESCHEDULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*reschedule\s*[.!]*\s*$|\b(?:reschedule|move|change|push)\b.*\b(?:appointment|appt|booking|reservation)\b",
    )
    .unwrap()
});

/// Detect an explicit command. Confirmation wins over everything else.
pub fn detect_command(text: &str) -> Option<Command> {
    if let Some(caps) = CONFIRM.captures(text) {
        let proposal_id = caps.get(1).map(|m| m.as_str().to_ascii_uppercase());
        return Some(Command::Confirm { proposal_id });
    }
    if CANCEL_REQUEST.is_match(text) {
        return Some(Command::CancelRequest);
    }
    if CANCEL_BOOKING.is_match(text) {
        return Some(Command::CancelBooking);
    }
    if RESCHEDULE.is_match(text) {
        return Some(Command::Reschedule);
    }
    None
}

// =============================================================================
// CONVERSATIONAL SIGNALS
// =============================================================================

/// How a message asks to replace earlier answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSignal {
    /// "instead" / "different": stated fields replace, the rest stays
    Change,
    /// "start over" / "new appointment": nothing earlier survives
    StartOver,
}

static CHANGE_SIGNAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:change|different|reschedule|instead)\b").unwrap());

static START_OVER_SIGNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:start (?:over|again|fresh)|from scratch|new (?:booking|appointment|appt|reservation))\b")
        .unwrap()
});

static BOOKING_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:book|booking|appointment|appt|schedule|reserve|reservation|availability|available|openings?|slot|come in|get in)\b",
    )
    .unwrap()
});

/// Detect a request to replace earlier answers. Starting over wins when
/// both are present.
pub fn detect_scope_signal(text: &str) -> Option<ScopeSignal> {
    if START_OVER_SIGNAL.is_match(text) {
        Some(ScopeSignal::StartOver)
    } else if CHANGE_SIGNAL.is_match(text) {
        Some(ScopeSignal::Change)
    } else {
        None
    }
}

/// The sender wants to replace earlier answers rather than add to them.
pub fn has_change_signal(text: &str) -> bool {
    detect_scope_signal(text).is_some()
}

/// The sender is asking to book something.
pub fn has_booking_intent(text: &str) -> bool {
    BOOKING_INTENT.is_match(text)
}

// =============================================================================
// FAQ
// =============================================================================

/// Frequently asked question topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaqTopic {
    Hours,
    Price,
    Location,
}

static FAQ_PATTERNS: Lazy<Vec<(Regex, FaqTopic)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:price|prices|pricing|cost|costs|how much|rates?|menu)\b").unwrap(),
            FaqTopic::Price,
        ),
        (
            Regex::new(r"(?i)\b(?:hours|open|opens|close|closes|closing)\b").unwrap(),
            FaqTopic::Hours,
        ),
        (
            Regex::new(r"(?i)\b(?:address|located|location|where are you|directions|parking)\b").unwrap(),
            FaqTopic::Location,
        ),
    ]
});

pub fn detect_faq(text: &str) -> Option<FaqTopic> {
    FAQ_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, topic)| *topic)
}
