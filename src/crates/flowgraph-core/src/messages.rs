//! Role-tagged conversation records
//!
//! The `messages` field of a conversational state is a `Vec<Message>` merged with
//! the [`Append`](crate::state::Append) reducer. A node that wants to add one
//! record returns a one-element vector; an empty vector leaves the history alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the assistant
    System,
    /// End-user input
    User,
    /// Model or pipeline output
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        f.write_str(role)
    }
}

/// One entry in a conversation history
///
/// Serializes as `{"role": "user", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Last message with the given role, if any
pub fn last_by_role(messages: &[Message], role: MessageRole) -> Option<&Message> {
    messages.iter().rev().find(|m| m.role == role)
}
