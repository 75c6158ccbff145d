//! Conversation Messages
//!
//! The data model shared by the controller, the backend and any rendering
//! surface: chat messages, their roles, and the identifiers that tie a
//! streaming update back to the message and turn it belongs to.
//!
//! # Design Philosophy
//!
//! A [`ChatMessage`] serializes to exactly what the backend expects in
//! `conversation_history` (`role`, `content`, optional `timestamp`). The
//! [`MessageId`] is client-local bookkeeping and never goes over the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-local message identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg_{}", self.0.simple())
    }
}

/// Generation token for one user → assistant round trip
///
/// Every submitted turn gets a fresh, strictly increasing id. `clear()` also
/// advances the generation, so a turn that is still streaming can tell that
/// the conversation it was writing into is gone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(pub u64);

impl TurnId {
    /// The id that follows this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn_{}", self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Model response
    Assistant,
    /// System message
    System,
}

impl MessageRole {
    /// Wire name of the role
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-local id, not part of the wire format
    #[serde(skip)]
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content (raw, including any thinking markers)
    pub content: String,
    /// When the message was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a message stamped with the current time
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Empty assistant message that a streaming turn fills in
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(MessageRole::Assistant, String::new())
    }
}
