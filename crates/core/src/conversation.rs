//! Conversation turns and message-log status tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Inbound message from the customer
    User,
    /// Outbound reply from the receptionist
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status column of a messages-log row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Received,
    Replied,
    OptOut,
    OptIn,
    Help,
    /// Transport delivery callback, e.g. `delivery:delivered`
    Delivery(String),
    /// Session snapshot row
    Session,
    /// Proposal snapshot row
    Proposal,
    /// Reply suppressed for an opted-out sender
    Suppressed,
    Error,
}

impl TurnStatus {
    pub fn as_str(&self) -> String {
        match self {
            TurnStatus::Received => "received".to_string(),
            TurnStatus::Replied => "replied".to_string(),
            TurnStatus::OptOut => "opt_out".to_string(),
            TurnStatus::OptIn => "opt_in".to_string(),
            TurnStatus::Help => "help".to_string(),
            TurnStatus::Delivery(s) => format!("delivery:{}", s),
            TurnStatus::Session => "session".to_string(),
            TurnStatus::Proposal => "proposal".to_string(),
            TurnStatus::Suppressed => "suppressed".to_string(),
            TurnStatus::Error => "error".to_string(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let status = match s {
            "received" => TurnStatus::Received,
            "replied" => TurnStatus::Replied,
            "opt_out" => TurnStatus::OptOut,
            "opt_in" => TurnStatus::OptIn,
            "help" => TurnStatus::Help,
            "session" => TurnStatus::Session,
            "proposal" => TurnStatus::Proposal,
            "suppressed" => TurnStatus::Suppressed,
            "error" => TurnStatus::Error,
            other => TurnStatus::Delivery(other.strip_prefix("delivery:")?.to_string()),
        };
        Some(status)
    }

    /// Compliance keyword rows
    pub fn is_compliance(&self) -> bool {
        matches!(self, TurnStatus::OptOut | TurnStatus::OptIn | TurnStatus::Help)
    }

    /// Only ordinary dialogue rows feed the history window.
    pub fn is_dialogue(&self) -> bool {
        matches!(self, TurnStatus::Received | TurnStatus::Replied)
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// A single turn in the conversation, projected from the messages log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(TurnRole::User, text, timestamp)
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(TurnRole::Assistant, text, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TurnStatus::Received,
            TurnStatus::OptOut,
            TurnStatus::Delivery("undelivered".to_string()),
            TurnStatus::Session,
        ] {
            assert_eq!(TurnStatus::parse(&status.as_str()), Some(status));
        }
        assert_eq!(TurnStatus::parse("mystery"), None);
    }

    #[test]
    fn test_status_classification() {
        assert!(TurnStatus::Help.is_compliance());
        assert!(!TurnStatus::Help.is_dialogue());
        assert!(TurnStatus::Replied.is_dialogue());
        assert!(!TurnStatus::Delivery("sent".to_string()).is_dialogue());
    }
}
