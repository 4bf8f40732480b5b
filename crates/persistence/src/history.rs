//! Conversation history window over the messages log

use chrono::{DateTime, Duration, Utc};

use receptionist_core::{phones_match, ConversationTurn, TurnRole};

use crate::rows::{Direction, MessageRow};

/// Bounds on the turns replayed into extraction
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    pub max_turns: usize,
    pub max_age: Duration,
}

impl HistoryWindow {
    pub fn new(max_turns: usize, max_age: Duration) -> Self {
        Self { max_turns, max_age }
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(16, Duration::hours(72))
    }
}

/// Which exchange to collect
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery<'a> {
    pub tenant: &'a str,
    pub customer: &'a str,
    pub business: &'a str,
    /// Only rows strictly before this instant (millisecond precision)
    pub before: DateTime<Utc>,
    /// Only rows at or after this instant, e.g. the session scope start
    pub not_before: Option<DateTime<Utc>>,
}

/// Collect dialogue turns for one exchange from rows in append order.
///
/// Walks backwards from the newest row and stops at the first row older
/// than the age cutoff. Compliance, snapshot and delivery rows are skipped.
/// Returns at most `max_turns` turns, oldest first.
pub fn collect_turns(rows: &[MessageRow], query: &HistoryQuery<'_>, window: &HistoryWindow) -> Vec<ConversationTurn> {
    let before_ms = query.before.timestamp_millis();
    let mut cutoff_ms = (query.before - window.max_age).timestamp_millis();
    if let Some(scope) = query.not_before {
        cutoff_ms = cutoff_ms.max(scope.timestamp_millis());
    }

    let mut turns = Vec::new();
    for row in rows.iter().rev() {
        if turns.len() >= window.max_turns {
            break;
        }
        let ts = row.timestamp.timestamp_millis();
        if ts >= before_ms {
            continue;
        }
        if ts < cutoff_ms {
            break;
        }
        if !row.status.is_dialogue() || row.tenant != query.tenant {
            continue;
        }
        if !phones_match(row.customer(), query.customer) || !phones_match(row.business(), query.business) {
            continue;
        }
        let role = match row.direction {
            Direction::Inbound => TurnRole::User,
            Direction::Outbound => TurnRole::Assistant,
            Direction::Internal => continue,
        };
        turns.push(ConversationTurn::new(role, row.body.clone(), row.timestamp));
    }
    turns.reverse();
    turns
}
