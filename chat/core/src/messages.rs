//! Chat Messages
//!
//! Identifiers, roles and statuses shared by the store and its surfaces, plus
//! the notifications a store pushes to whichever UI surface is observing it.
//!
//! # Design Philosophy
//!
//! The store owns all conversation state. Surfaces (terminal, web, tests) are
//! pure renderers: they read snapshots through the store's getters and may
//! subscribe to [`ChatNotification`]s to render tokens as they arrive, but
//! they never mutate threads or messages directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Thread identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// The weather agent
    Assistant,
}

impl MessageRole {
    /// Wire name used in request history and exports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Lifecycle of a single message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Final content
    Sent,
    /// Content still growing as deltas arrive
    Streaming,
    /// The send that produced this message failed
    Error,
}

/// Notifications from the store to an observing UI surface
///
/// Sent over an unbounded channel so applying a streamed event never waits on
/// a slow renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatNotification {
    /// A thread was created lazily from the first streamed chunk
    ThreadCreated {
        /// The new thread
        thread_id: ThreadId,
        /// Title derived from the user's message
        title: String,
    },

    /// A streaming token (partial response)
    Token {
        /// Thread the message belongs to
        thread_id: ThreadId,
        /// Assistant message receiving the token
        message_id: MessageId,
        /// The token text
        text: String,
    },

    /// Stream has completed
    StreamEnd {
        /// Thread that received the response, if one was ever created
        thread_id: Option<ThreadId>,
        /// Final assistant message content
        final_content: String,
    },

    /// Stream encountered an error
    StreamError {
        /// Thread that received the response, if one was ever created
        thread_id: Option<ThreadId>,
        /// Error description
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Streaming).unwrap(),
            "\"streaming\""
        );
    }

    #[test]
    fn test_ids_are_transparent() {
        let id = ThreadId::from("thread-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"thread-1\"");
        assert_eq!(id.to_string(), "thread-1");
    }
}
