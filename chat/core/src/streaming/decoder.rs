//! Stream Decoder
//!
//! Turns the agent's chunked, line-delimited response body into
//! [`StreamEvent`]s. The network layer may split the body anywhere, including
//! inside a line or inside a multi-byte character, so raw bytes are buffered
//! and a line is only decoded once the newline that closes it has arrived.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Prefix of a content delta line
pub const TEXT_PREFIX: &str = "0:";
/// Prefix of the unconditional end-of-stream line
pub const DONE_PREFIX: &str = "d:";
/// Prefix of a finish record that may end the stream
pub const FINISH_PREFIX: &str = "e:";

/// Capacity of the channel between the decode task and the store
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// High-level events produced from a response body
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of assistant text
    TextDelta(String),
    /// The response finished normally
    Complete,
    /// Reading the response failed
    Error(String),
}

impl StreamEvent {
    /// Whether this event resolves the send
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }
}

/// Classification of one complete line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Text to append to the assistant message
    Delta(String),
    /// The stream is over
    End,
    /// Blank, metadata, empty delta, or a finish record that does not stop
    Ignored,
}

/// Classify a single complete line (without its newline)
#[must_use]
pub fn classify_line(raw: &str) -> LineKind {
    let line = raw.trim();
    if line.is_empty() {
        return LineKind::Ignored;
    }

    if let Some(payload) = line.strip_prefix(TEXT_PREFIX) {
        let payload = unquote(payload);
        if payload.trim().is_empty() {
            return LineKind::Ignored;
        }
        return LineKind::Delta(payload.to_string());
    }

    if line.starts_with(DONE_PREFIX) {
        return LineKind::End;
    }

    if let Some(record) = line.strip_prefix(FINISH_PREFIX) {
        return match serde_json::from_str::<Value>(record) {
            Ok(value) if is_stop_record(&value) => LineKind::End,
            Ok(_) => LineKind::Ignored,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable finish record");
                LineKind::Ignored
            }
        };
    }

    LineKind::Ignored
}

/// Strip exactly one pair of surrounding double quotes
fn unquote(payload: &str) -> &str {
    match payload.strip_prefix('"') {
        // A lone quote opens and closes on the same character
        Some(rest) if payload.ends_with('"') => rest.strip_suffix('"').unwrap_or(rest),
        _ => payload,
    }
}

/// `finishReason == "stop"` and `isContinued == false`
fn is_stop_record(record: &Value) -> bool {
    record.get("finishReason").and_then(Value::as_str) == Some("stop")
        && record.get("isContinued").and_then(Value::as_bool) == Some(false)
}

/// Incremental line decoder
///
/// Feed it chunks with [`push`](Self::push) and signal the end of the body
/// with [`finish`](Self::finish) or [`fail`](Self::fail). Once a terminal
/// event has been produced the decoder ignores all further input.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl StreamDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been produced
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes held back waiting for a newline
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a chunk and return the events of every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let kind = classify_line(&String::from_utf8_lossy(&self.buffer[start..end]));
            start = end + 1;

            match kind {
                LineKind::Delta(text) => events.push(StreamEvent::TextDelta(text)),
                LineKind::End => {
                    tracing::debug!(
                        discarded_bytes = self.buffer.len() - start,
                        "Stream end marker received"
                    );
                    self.finished = true;
                    self.buffer.clear();
                    events.push(StreamEvent::Complete);
                    return events;
                }
                LineKind::Ignored => {}
            }
        }

        self.buffer.drain(..start);
        events
    }

    /// Natural end of the body; `Complete` unless already finished
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        if !self.buffer.is_empty() {
            tracing::debug!(
                discarded_bytes = self.buffer.len(),
                "Discarding unterminated trailing line"
            );
        }
        self.finished = true;
        self.buffer.clear();
        Some(StreamEvent::Complete)
    }

    /// Transport failure; `Error` unless already finished
    pub fn fail(&mut self, error: impl Into<String>) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.buffer.clear();
        Some(StreamEvent::Error(error.into()))
    }
}

/// Decode a byte stream, sending every event to `tx` in order
///
/// Exactly one terminal event is sent unless the receiver goes away first.
pub async fn decode_stream<S>(mut stream: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin,
{
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in decoder.push(&bytes) {
                    if tx.send(event).await.is_err() {
                        tracing::debug!("Event receiver dropped, stopping decode");
                        return;
                    }
                }
                if decoder.is_finished() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Response stream failed");
                if let Some(event) = decoder.fail(e.to_string()) {
                    let _ = tx.send(event).await;
                }
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        let _ = tx.send(event).await;
    }
}

/// Spawn a task decoding `stream`; events arrive on the returned receiver
pub fn spawn_decoder<S>(stream: S) -> mpsc::Receiver<StreamEvent>
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(decode_stream(stream, tx));
    rx
}
