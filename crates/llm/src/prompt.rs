//! Chat messages and prompt assembly

use serde::{Deserialize, Serialize};
use std::fmt;

use receptionist_core::{ConversationTurn, TurnRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// System instructions, then prior turns oldest first, then the current text.
///
/// Empty prior turns are skipped; `max_prior` keeps only the most recent ones.
pub fn build_messages(
    system_instructions: &str,
    prior_turns: &[ConversationTurn],
    user_text: &str,
    max_prior: usize,
) -> Vec<Message> {
    let skip = prior_turns.len().saturating_sub(max_prior);
    let mut messages = Vec::with_capacity(prior_turns.len().min(max_prior) + 2);

    if !system_instructions.trim().is_empty() {
        messages.push(Message::system(system_instructions));
    }
    messages.extend(
        prior_turns
            .iter()
            .skip(skip)
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| Message::new(turn.role.into(), turn.text.clone())),
    );
    messages.push(Message::user(user_text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_build_messages_order() {
        let now = Utc::now();
        let turns = vec![
            ConversationTurn::user("massage tomorrow?", now),
            ConversationTurn::assistant("What time works?", now),
            ConversationTurn::user("  ", now),
        ];
        let messages = build_messages("extract", &turns, "3pm", 10);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages.last().unwrap().content, "3pm");
    }

    #[test]
    fn test_build_messages_keeps_recent() {
        let now = Utc::now();
        let turns: Vec<_> = (0..6).map(|i| ConversationTurn::user(format!("m{}", i), now)).collect();
        let messages = build_messages("", &turns, "now", 2);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5", "now"]);
    }
}
