//! Conversation Store
//!
//! Owns every thread and orchestrates at most one in-flight send.
//!
//! # Send lifecycle
//!
//! ```text
//! send_message ──► placeholders / pending message ──► request ──► transport
//!                                                                   │
//!          poll_streaming / next_update / drive_to_completion ◄─────┘
//!                      (decoder events applied in order)
//! ```
//!
//! `send_message` does not wait on the network: it records the send and
//! hands the request to a spawned task that opens the stream and decodes it.
//! A failed open arrives as an error event like any other. Events produced
//! by that task are applied when the owner calls [`ConversationStore::poll_streaming`]
//! (non-blocking), [`ConversationStore::next_update`] or
//! [`ConversationStore::drive_to_completion`].
//!
//! When the send has no thread to go to, the thread is created lazily on the
//! first text delta. A send that fails before any text arrived leaves no
//! thread behind.

mod export;
mod state;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::backend::{ChatTransport, HistoryEntry, RequestBuilder};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::messages::{ChatNotification, MessageId, MessageStatus, ThreadId};
use crate::streaming::{decode_stream, StreamEvent, EVENT_CHANNEL_CAPACITY};
use crate::thread::{derive_title, Message, MessageUpdate, Thread};

pub use export::{ExportedThread, ThreadExport};
use state::Action;
pub use state::ConversationState;

/// Error shown when request construction fails
pub const SEND_FAILED_MESSAGE: &str = "Failed to send message";

/// Error applied when the decode task goes away without a terminal event
const STREAM_CLOSED_MESSAGE: &str = "Response stream closed unexpectedly";

/// Per-send bookkeeping
#[derive(Debug)]
struct SendContext {
    /// The user's message as submitted
    content: String,
    /// Text streamed so far
    accumulated_text: String,
    /// Thread receiving the response, once known
    target_thread_id: Option<ThreadId>,
    /// Assistant message receiving the response, once known
    target_message_id: Option<MessageId>,
}

/// A send whose response is still streaming
struct InFlight {
    context: SendContext,
    events: mpsc::Receiver<StreamEvent>,
}

/// Reducer-driven owner of all conversation state
pub struct ConversationStore<T: ChatTransport> {
    state: ConversationState,
    transport: Arc<T>,
    request_builder: Arc<dyn RequestBuilder>,
    ids: Arc<dyn IdGenerator>,
    config: StoreConfig,
    notifications: Option<mpsc::UnboundedSender<ChatNotification>>,
    in_flight: Option<InFlight>,
}

impl<T: ChatTransport + 'static> ConversationStore<T> {
    /// Create an empty store using random ids
    pub fn new(
        transport: Arc<T>,
        request_builder: Arc<dyn RequestBuilder>,
        config: StoreConfig,
    ) -> Self {
        Self {
            state: ConversationState::new(),
            transport,
            request_builder,
            ids: Arc::new(UuidIdGenerator),
            config,
            notifications: None,
            in_flight: None,
        }
    }

    /// Replace the id generator
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Push [`ChatNotification`]s to `tx` as events are applied
    #[must_use]
    pub fn with_notifications(mut self, tx: mpsc::UnboundedSender<ChatNotification>) -> Self {
        self.notifications = Some(tx);
        self
    }

    /// Read-only view of the state
    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Store configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Transport used for sends
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Messages of the active thread, or empty
    #[must_use]
    pub fn active_messages(&self) -> &[Message] {
        self.state.active_messages()
    }

    /// Threads ordered most recently active first
    #[must_use]
    pub fn thread_list(&self) -> Vec<&Thread> {
        self.state.thread_list()
    }

    fn dispatch(&mut self, action: Action) {
        self.state.apply(action, Utc::now());
    }

    fn notify(&self, notification: ChatNotification) {
        if let Some(tx) = &self.notifications {
            if tx.send(notification).is_err() {
                tracing::debug!("Notification receiver dropped");
            }
        }
    }

    fn next_id(&self) -> String {
        self.ids.generate()
    }

    /// Insert an empty thread and make it active
    pub fn create_thread(&mut self, title: impl Into<String>) -> ThreadId {
        let id = ThreadId::from(self.next_id());
        let title = title.into();
        tracing::debug!(thread_id = %id, title = %title, "Creating thread");
        self.dispatch(Action::CreateThread {
            id: id.clone(),
            title,
        });
        id
    }

    /// Insert an empty thread with the default title
    pub fn new_chat(&mut self) -> ThreadId {
        let title = self.config.default_thread_title.clone();
        self.create_thread(title)
    }

    /// Make `id` the active thread and clear any stale error
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ThreadNotFound`] without changing state when no
    /// thread has this id.
    pub fn set_active_thread(&mut self, id: &ThreadId) -> Result<(), StoreError> {
        if self.state.thread(id).is_none() {
            tracing::warn!(thread_id = %id, "Cannot activate unknown thread");
            return Err(StoreError::ThreadNotFound(id.clone()));
        }
        self.dispatch(Action::SetActiveThread(id.clone()));
        Ok(())
    }

    /// Replace a thread's title; any string is accepted
    pub fn update_thread_title(&mut self, id: &ThreadId, title: impl Into<String>) {
        self.dispatch(Action::UpdateThreadTitle {
            thread_id: id.clone(),
            title: title.into(),
        });
    }

    /// Empty the given or active thread; no-op when nothing resolves
    pub fn clear_thread(&mut self, id: Option<&ThreadId>) {
        if let Some(id) = self.resolve_thread(id) {
            self.dispatch(Action::ClearThread(id));
        }
    }

    /// Remove a thread
    ///
    /// Deleting the active thread activates the most recently active
    /// remaining thread, or none.
    pub fn delete_thread(&mut self, id: &ThreadId) {
        tracing::debug!(thread_id = %id, "Deleting thread");
        self.dispatch(Action::DeleteThread(id.clone()));
    }

    /// Snapshot the given or active thread
    #[must_use]
    pub fn export_thread(&self, id: Option<&ThreadId>) -> Option<ThreadExport> {
        let id = self.resolve_thread(id)?;
        self.state
            .thread(&id)
            .map(|thread| ThreadExport::from_thread(thread, Utc::now()))
    }

    /// Explicit id, else the active id, as long as the thread exists
    fn resolve_thread(&self, id: Option<&ThreadId>) -> Option<ThreadId> {
        id.or(self.state.active_thread_id())
            .filter(|id| self.state.thread(id).is_some())
            .cloned()
    }

    /// Send `content` to the active thread (or a new one)
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::send_message_to`].
    pub fn send_message(&mut self, content: &str) -> Result<(), StoreError> {
        self.send_message_to(content, None)
    }

    /// Send `content` to `thread_id`, falling back to the active thread
    ///
    /// Returns as soon as the send is recorded. Transport failures are
    /// recorded in state when their event is applied, not returned.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyInput`] if `content` is blank
    /// - [`StoreError::ConcurrentSendRejected`] if a send is in flight
    ///
    /// Neither changes state.
    pub fn send_message_to(
        &mut self,
        content: &str,
        thread_id: Option<&ThreadId>,
    ) -> Result<(), StoreError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            tracing::debug!("Ignoring empty message");
            return Err(StoreError::EmptyInput);
        }
        if self.state.is_loading() {
            tracing::warn!("Send rejected: a message is already in flight");
            return Err(StoreError::ConcurrentSendRejected);
        }

        self.dispatch(Action::SetLoading(true));
        self.dispatch(Action::SetStreaming(true));
        self.dispatch(Action::SetError(None));

        let mut context = SendContext {
            content: content.to_string(),
            accumulated_text: String::new(),
            target_thread_id: None,
            target_message_id: None,
        };

        let history: Vec<HistoryEntry> = match self.resolve_thread(thread_id) {
            Some(id) => {
                let history = self
                    .state
                    .thread(&id)
                    .map(Thread::history)
                    .unwrap_or_default();
                let now = Utc::now();
                let user = Message::user(MessageId::from(self.next_id()), trimmed, now);
                let assistant_id = MessageId::from(self.next_id());
                let assistant = Message::streaming_assistant(assistant_id.clone(), "", now);
                self.dispatch(Action::AddMessage {
                    thread_id: id.clone(),
                    message: user,
                });
                self.dispatch(Action::AddMessage {
                    thread_id: id.clone(),
                    message: assistant,
                });
                context.target_thread_id = Some(id);
                context.target_message_id = Some(assistant_id);
                history
            }
            None => {
                self.dispatch(Action::SetPendingUserMessage(Some(content.to_string())));
                Vec::new()
            }
        };

        tracing::info!(
            thread_id = ?context.target_thread_id,
            history = history.len(),
            transport = self.transport.name(),
            "Sending message"
        );

        let payload = match self.request_builder.build(content, &history) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build request");
                self.fail_send(&context, SEND_FAILED_MESSAGE.to_string());
                return Ok(());
            }
        };

        let transport = Arc::clone(&self.transport);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            match transport.open_stream(&payload).await {
                Ok(body) => decode_stream(body, tx).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to open response stream");
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                }
            }
        });

        self.in_flight = Some(InFlight {
            context,
            events: rx,
        });
        Ok(())
    }

    /// Whether a response is still being received
    #[must_use]
    pub fn has_pending_stream(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Apply every event already decoded, without waiting
    ///
    /// Returns true if any event was applied.
    pub fn poll_streaming(&mut self) -> bool {
        let Some(mut flight) = self.in_flight.take() else {
            return false;
        };

        let mut activity = false;
        loop {
            match flight.events.try_recv() {
                Ok(event) => {
                    activity = true;
                    if self.apply_event(&mut flight.context, event) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.apply_event(
                        &mut flight.context,
                        StreamEvent::Error(STREAM_CLOSED_MESSAGE.to_string()),
                    );
                    return true;
                }
            }
        }

        self.in_flight = Some(flight);
        activity
    }

    /// Wait for the next decoded event and apply it
    ///
    /// Returns false when no send is in flight. Cancel-safe: dropping the
    /// future while it waits leaves the send in flight.
    pub async fn next_update(&mut self) -> bool {
        let Some(flight) = self.in_flight.as_mut() else {
            return false;
        };

        let event = flight
            .events
            .recv()
            .await
            .unwrap_or_else(|| StreamEvent::Error(STREAM_CLOSED_MESSAGE.to_string()));

        let Some(mut flight) = self.in_flight.take() else {
            return false;
        };
        if !self.apply_event(&mut flight.context, event) {
            self.in_flight = Some(flight);
        }
        true
    }

    /// Apply events until the in-flight send resolves
    pub async fn drive_to_completion(&mut self) {
        while self.next_update().await {}
    }

    /// Apply one decoder event; returns true if it resolved the send
    fn apply_event(&mut self, context: &mut SendContext, event: StreamEvent) -> bool {
        match event {
            StreamEvent::TextDelta(text) => {
                context.accumulated_text.push_str(&text);
                if let (Some(thread_id), Some(message_id)) = (
                    context.target_thread_id.clone(),
                    context.target_message_id.clone(),
                ) {
                    self.dispatch(Action::UpdateMessage {
                        thread_id: thread_id.clone(),
                        message_id: message_id.clone(),
                        update: MessageUpdate::content(context.accumulated_text.clone()),
                    });
                    self.notify(ChatNotification::Token {
                        thread_id,
                        message_id,
                        text,
                    });
                } else {
                    self.create_lazy_thread(context, text);
                }
                false
            }
            StreamEvent::Complete => {
                if let (Some(thread_id), Some(message_id)) =
                    (&context.target_thread_id, &context.target_message_id)
                {
                    self.dispatch(Action::UpdateMessage {
                        thread_id: thread_id.clone(),
                        message_id: message_id.clone(),
                        update: MessageUpdate::status(MessageStatus::Sent),
                    });
                }
                self.finish_send();
                tracing::info!(
                    thread_id = ?context.target_thread_id,
                    chars = context.accumulated_text.chars().count(),
                    "Response complete"
                );
                self.notify(ChatNotification::StreamEnd {
                    thread_id: context.target_thread_id.clone(),
                    final_content: context.accumulated_text.clone(),
                });
                true
            }
            StreamEvent::Error(message) => {
                self.fail_send(context, message);
                true
            }
        }
    }

    /// First delta of a send with no thread: create it with both messages
    fn create_lazy_thread(&mut self, context: &mut SendContext, delta: String) {
        let thread_id = ThreadId::from(self.next_id());
        let title = derive_title(&context.content, self.config.title_max_chars);
        let now = Utc::now();

        self.dispatch(Action::CreateThread {
            id: thread_id.clone(),
            title: title.clone(),
        });
        let user = Message::user(
            MessageId::from(self.next_id()),
            context.content.trim(),
            now,
        );
        self.dispatch(Action::AddMessage {
            thread_id: thread_id.clone(),
            message: user,
        });
        let assistant_id = MessageId::from(self.next_id());
        self.dispatch(Action::AddMessage {
            thread_id: thread_id.clone(),
            message: Message::streaming_assistant(
                assistant_id.clone(),
                context.accumulated_text.clone(),
                now,
            ),
        });
        self.dispatch(Action::SetPendingUserMessage(None));

        tracing::info!(thread_id = %thread_id, title = %title, "Created thread from first response chunk");
        self.notify(ChatNotification::ThreadCreated {
            thread_id: thread_id.clone(),
            title,
        });
        self.notify(ChatNotification::Token {
            thread_id: thread_id.clone(),
            message_id: assistant_id.clone(),
            text: delta,
        });

        context.target_thread_id = Some(thread_id);
        context.target_message_id = Some(assistant_id);
    }

    /// Resolve the send as failed
    fn fail_send(&mut self, context: &SendContext, error: String) {
        tracing::warn!(thread_id = ?context.target_thread_id, error = %error, "Send failed");
        self.dispatch(Action::SetError(Some(error.clone())));

        if let (Some(thread_id), Some(message_id)) =
            (&context.target_thread_id, &context.target_message_id)
        {
            let content = if context.accumulated_text.is_empty() {
                self.config.error_fallback.clone()
            } else {
                context.accumulated_text.clone()
            };
            self.dispatch(Action::UpdateMessage {
                thread_id: thread_id.clone(),
                message_id: message_id.clone(),
                update: MessageUpdate {
                    content: Some(content),
                    status: Some(MessageStatus::Error),
                },
            });
        }

        self.finish_send();
        self.notify(ChatNotification::StreamError {
            thread_id: context.target_thread_id.clone(),
            error,
        });
    }

    /// Clear the transient flags of a resolved send
    fn finish_send(&mut self) {
        self.dispatch(Action::SetLoading(false));
        self.dispatch(Action::SetStreaming(false));
        self.dispatch(Action::SetPendingUserMessage(None));
    }
}
