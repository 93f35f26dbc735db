//! Conversation state and its reducer
//!
//! Every mutation goes through [`ConversationState::apply`], one [`Action`] at
//! a time. Readers get `&ConversationState` and the getters below.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::messages::{MessageId, ThreadId};
use crate::thread::{Message, MessageUpdate, Thread};

/// A single state transition
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Action {
    /// Insert an empty thread and make it active
    CreateThread { id: ThreadId, title: String },
    /// Point the active thread at `id` and clear any stale error
    SetActiveThread(ThreadId),
    /// Append a message to a thread
    AddMessage { thread_id: ThreadId, message: Message },
    /// Patch a message by id
    UpdateMessage {
        thread_id: ThreadId,
        message_id: MessageId,
        update: MessageUpdate,
    },
    /// Replace a thread's title
    UpdateThreadTitle { thread_id: ThreadId, title: String },
    /// Drop every message of a thread
    ClearThread(ThreadId),
    /// Remove a thread, re-pointing the active thread if needed
    DeleteThread(ThreadId),
    SetLoading(bool),
    SetStreaming(bool),
    SetError(Option<String>),
    SetPendingUserMessage(Option<String>),
}

/// All conversation state for one session
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    threads: HashMap<ThreadId, Thread>,
    active_thread_id: Option<ThreadId>,
    is_loading: bool,
    is_streaming: bool,
    error: Option<String>,
    pending_user_message: Option<String>,
    /// Monotonic counter stamped on threads at every mutation
    activity_counter: u64,
}

impl ConversationState {
    /// Empty state: no threads, nothing in flight
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All threads by id
    #[must_use]
    pub fn threads(&self) -> &HashMap<ThreadId, Thread> {
        &self.threads
    }

    /// Look up one thread
    #[must_use]
    pub fn thread(&self, id: &ThreadId) -> Option<&Thread> {
        self.threads.get(id)
    }

    /// The active thread pointer; always a key of [`Self::threads`] when set
    #[must_use]
    pub fn active_thread_id(&self) -> Option<&ThreadId> {
        self.active_thread_id.as_ref()
    }

    /// The active thread
    #[must_use]
    pub fn active_thread(&self) -> Option<&Thread> {
        self.active_thread_id
            .as_ref()
            .and_then(|id| self.threads.get(id))
    }

    /// True while a send is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// True while response text may still arrive
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// User-visible error from the last failed send
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Message waiting for its lazily created thread
    #[must_use]
    pub fn pending_user_message(&self) -> Option<&str> {
        self.pending_user_message.as_deref()
    }

    /// Messages of the active thread, or empty
    #[must_use]
    pub fn active_messages(&self) -> &[Message] {
        self.active_thread()
            .map(|t| t.messages.as_slice())
            .unwrap_or_default()
    }

    /// Threads ordered most recently active first
    #[must_use]
    pub fn thread_list(&self) -> Vec<&Thread> {
        let mut list: Vec<&Thread> = self.threads.values().collect();
        list.sort_by(|a, b| b.activity_key().cmp(&a.activity_key()));
        list
    }

    fn next_activity(&mut self) -> u64 {
        self.activity_counter += 1;
        self.activity_counter
    }

    /// Apply one action
    pub(crate) fn apply(&mut self, action: Action, now: DateTime<Utc>) {
        match action {
            Action::CreateThread { id, title } => {
                let seq = self.next_activity();
                let mut thread = Thread::new(id.clone(), title, now);
                thread.touch(now, seq);
                self.threads.insert(id.clone(), thread);
                self.active_thread_id = Some(id);
            }

            Action::SetActiveThread(id) => {
                self.active_thread_id = Some(id);
                self.error = None;
            }

            Action::AddMessage { thread_id, message } => {
                let seq = self.next_activity();
                match self.threads.get_mut(&thread_id) {
                    Some(thread) => {
                        thread.messages.push(message);
                        thread.touch(now, seq);
                    }
                    None => {
                        tracing::warn!(thread_id = %thread_id, "Dropping message for missing thread");
                    }
                }
            }

            Action::UpdateMessage {
                thread_id,
                message_id,
                update,
            } => {
                let seq = self.next_activity();
                let Some(thread) = self.threads.get_mut(&thread_id) else {
                    tracing::warn!(thread_id = %thread_id, "Dropping update for missing thread");
                    return;
                };
                if thread.update_message(&message_id, update) {
                    thread.touch(now, seq);
                } else {
                    tracing::debug!(message_id = %message_id, "Update target no longer exists");
                }
            }

            Action::UpdateThreadTitle { thread_id, title } => {
                if let Some(thread) = self.threads.get_mut(&thread_id) {
                    thread.title = title;
                }
            }

            Action::ClearThread(thread_id) => {
                if let Some(thread) = self.threads.get_mut(&thread_id) {
                    thread.messages.clear();
                }
            }

            Action::DeleteThread(thread_id) => {
                if self.threads.remove(&thread_id).is_none() {
                    return;
                }
                if self.active_thread_id.as_ref() == Some(&thread_id) {
                    self.active_thread_id = self
                        .threads
                        .values()
                        .max_by_key(|t| t.activity_key())
                        .map(|t| t.id.clone());
                }
            }

            Action::SetLoading(value) => self.is_loading = value,
            Action::SetStreaming(value) => self.is_streaming = value,
            Action::SetError(error) => self.error = error,
            Action::SetPendingUserMessage(message) => self.pending_user_message = message,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::messages::MessageStatus;

    fn create(state: &mut ConversationState, id: &str) -> ThreadId {
        let id = ThreadId::from(id);
        state.apply(
            Action::CreateThread {
                id: id.clone(),
                title: "New Chat".to_string(),
            },
            Utc::now(),
        );
        id
    }

    fn add_user(state: &mut ConversationState, thread_id: &ThreadId, msg_id: &str) {
        state.apply(
            Action::AddMessage {
                thread_id: thread_id.clone(),
                message: Message::user(MessageId::from(msg_id.to_string()), "Hi", Utc::now()),
            },
            Utc::now(),
        );
    }

    #[test]
    fn test_create_thread_becomes_active() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        let b = create(&mut state, "b");

        assert_eq!(state.threads().len(), 2);
        assert_eq!(state.active_thread_id(), Some(&b));
        assert!(state.thread(&a).unwrap().messages.is_empty());
        assert!(state.active_messages().is_empty());
    }

    #[test]
    fn test_set_active_thread_clears_error() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        create(&mut state, "b");
        state.apply(Action::SetError(Some("boom".to_string())), Utc::now());

        state.apply(Action::SetActiveThread(a.clone()), Utc::now());
        assert_eq!(state.active_thread_id(), Some(&a));
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_thread_list_orders_by_activity() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        let b = create(&mut state, "b");
        let c = create(&mut state, "c");
        add_user(&mut state, &a, "m1");

        let order: Vec<&ThreadId> = state.thread_list().iter().map(|t| &t.id).collect();
        assert_eq!(order, vec![&a, &c, &b]);
    }

    #[test]
    fn test_update_message_touches_thread() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        let b = create(&mut state, "b");
        let msg_id = MessageId::from("m".to_string());
        state.apply(
            Action::AddMessage {
                thread_id: a.clone(),
                message: Message::streaming_assistant(msg_id.clone(), "", Utc::now()),
            },
            Utc::now(),
        );
        add_user(&mut state, &b, "m2");

        state.apply(
            Action::UpdateMessage {
                thread_id: a.clone(),
                message_id: msg_id.clone(),
                update: MessageUpdate::status(MessageStatus::Sent),
            },
            Utc::now(),
        );

        assert_eq!(state.thread_list()[0].id, a);
        let msg = state.thread(&a).unwrap().get_message(&msg_id).unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
    }

    #[test]
    fn test_delete_active_picks_most_recent_remaining() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        let b = create(&mut state, "b");
        let c = create(&mut state, "c");
        add_user(&mut state, &a, "m1");
        state.apply(Action::SetActiveThread(c.clone()), Utc::now());

        state.apply(Action::DeleteThread(c.clone()), Utc::now());
        assert_eq!(state.active_thread_id(), Some(&a));
        assert!(state.thread(&b).is_some());

        state.apply(Action::DeleteThread(a), Utc::now());
        assert_eq!(state.active_thread_id(), Some(&b));

        state.apply(Action::DeleteThread(b), Utc::now());
        assert_eq!(state.active_thread_id(), None);
        assert!(state.threads().is_empty());
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        let b = create(&mut state, "b");

        state.apply(Action::DeleteThread(a), Utc::now());
        assert_eq!(state.active_thread_id(), Some(&b));
    }

    #[test]
    fn test_clear_and_rename() {
        let mut state = ConversationState::new();
        let a = create(&mut state, "a");
        add_user(&mut state, &a, "m1");

        state.apply(
            Action::UpdateThreadTitle {
                thread_id: a.clone(),
                title: "Paris trip".to_string(),
            },
            Utc::now(),
        );
        state.apply(Action::ClearThread(a.clone()), Utc::now());

        let thread = state.thread(&a).unwrap();
        assert_eq!(thread.title, "Paris trip");
        assert!(thread.messages.is_empty());
    }
}
