//! Chat Backend Traits
//!
//! The store talks to the agent through two collaborators:
//!
//! - [`RequestBuilder`] turns the user's message and the thread history into
//!   an opaque JSON payload.
//! - [`ChatTransport`] sends that payload and hands back the raw response
//!   body as a stream of byte chunks.
//!
//! The store never interprets the payload, and never sees HTTP: a transport
//! reports a non-success status as a [`TransportError`] before any body bytes
//! are produced.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::messages::MessageRole;

/// Raw response body, chunked however the network delivered it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// One prior message as sent to the agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who sent the message
    pub role: MessageRole,
    /// Message content
    pub content: String,
}

/// Builds the outbound request payload
pub trait RequestBuilder: Send + Sync {
    /// Build a payload for `user_message` following `history`
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be constructed.
    fn build(&self, user_message: &str, history: &[HistoryEntry]) -> anyhow::Result<Value>;
}

/// Sends a payload and streams back the response body
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logs (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Send `payload` and return the response body
    ///
    /// Fails with [`TransportError::Status`] for a non-success response and
    /// [`TransportError::Network`] if the request could not be sent. Errors
    /// while reading the body are yielded by the stream itself.
    async fn open_stream(&self, payload: &Value) -> Result<ByteStream, TransportError>;
}
