//! Threads and their messages
//!
//! A thread is one independent conversation with its own history and title.
//! Threads are owned by the store; surfaces only ever see shared references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::HistoryEntry;
use crate::messages::{MessageId, MessageRole, MessageStatus, ThreadId};

/// A message in a thread
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Lifecycle status
    pub status: MessageStatus,
}

impl Message {
    /// Create a sent user message
    pub fn user(id: MessageId, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            timestamp: now,
            status: MessageStatus::Sent,
        }
    }

    /// Create a streaming assistant message with initial content
    pub fn streaming_assistant(
        id: MessageId,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: now,
            status: MessageStatus::Streaming,
        }
    }

    /// Whether the message is still receiving deltas
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}

/// Partial update applied to a message by id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageUpdate {
    /// Replacement content
    pub content: Option<String>,
    /// Replacement status
    pub status: Option<MessageStatus>,
}

impl MessageUpdate {
    /// Replace the content only
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            status: None,
        }
    }

    /// Replace the status only
    #[must_use]
    pub fn status(status: MessageStatus) -> Self {
        Self {
            content: None,
            status: Some(status),
        }
    }
}

/// One conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique thread ID
    pub id: ThreadId,
    /// User-editable title
    pub title: String,
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// Last message mutation; orders the thread list
    pub last_activity: DateTime<Utc>,
    /// Store-wide activity counter at the last mutation, breaks timestamp ties
    #[serde(skip)]
    pub(crate) activity_seq: u64,
}

impl Thread {
    /// Create an empty thread
    pub fn new(id: ThreadId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
            activity_seq: 0,
        }
    }

    /// Record a mutation
    pub(crate) fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.last_activity = now;
        self.activity_seq = seq;
    }

    /// Ordering key for "most recently active"
    pub(crate) fn activity_key(&self) -> (DateTime<Utc>, u64) {
        (self.last_activity, self.activity_seq)
    }

    /// Get message by ID
    #[must_use]
    pub fn get_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Apply an update to the message with `id`; returns false if it is gone
    pub(crate) fn update_message(&mut self, id: &MessageId, update: MessageUpdate) -> bool {
        let Some(msg) = self.messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if let Some(content) = update.content {
            msg.content = content;
        }
        if let Some(status) = update.status {
            msg.status = status;
        }
        true
    }

    /// The assistant message currently receiving deltas, if any
    #[must_use]
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_streaming())
    }

    /// History as `{role, content}` pairs for the request builder
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Title for a lazily created thread: the first `max_chars` characters of the
/// message, suffixed with `...` when the message is longer
#[must_use]
pub fn derive_title(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let head: String = content.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
