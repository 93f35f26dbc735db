//! Response Streaming
//!
//! Decodes the agent's line-delimited response body into [`StreamEvent`]s.
//!
//! # Wire Format
//!
//! ```text
//! f:{"messageId":"msg-1"}                          metadata, ignored
//! 0:"The weather in Paris "                        text delta
//! 0:"is sunny."                                    text delta
//! e:{"finishReason":"stop","isContinued":false}    end of stream
//! d:{"finishReason":"stop"}                        end of stream
//! ```
//!
//! # Example
//!
//! ```ignore
//! use weather_chat_core::streaming::{spawn_decoder, StreamEvent};
//!
//! let stream = transport.open_stream(&payload).await?;
//! let mut rx = spawn_decoder(stream);
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         StreamEvent::TextDelta(text) => print!("{text}"),
//!         StreamEvent::Complete => break,
//!         StreamEvent::Error(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

mod decoder;

pub use decoder::{
    classify_line, decode_stream, spawn_decoder, LineKind, StreamDecoder, StreamEvent,
    DONE_PREFIX, EVENT_CHANNEL_CAPACITY, FINISH_PREFIX, TEXT_PREFIX,
};
