//! Weather Chat Core - Headless Conversation Engine for the weather agent
//!
//! This crate holds everything a weather chat client needs apart from the
//! UI: decoding the agent's streamed responses and keeping an in-memory set
//! of conversation threads up to date while they arrive. It can drive a
//! terminal client, a web front end, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//!   UI surface (terminal REPL, web, tests)
//!      │  send_message / create_thread / ...      ▲ ChatNotification
//!      ▼                                          │ &ConversationState
//!   ConversationStore ─── RequestBuilder ──► JSON payload
//!      ▲                        │
//!      │ StreamEvent            ▼
//!   StreamDecoder ◄── bytes ── ChatTransport (HTTP POST, streamed body)
//! ```
//!
//! # Key Types
//!
//! - [`ConversationStore`]: owns all threads, runs one send at a time
//! - [`ConversationState`]: read-only view of threads and transient flags
//! - [`StreamDecoder`]: incremental decoder for the `0:` / `d:` / `e:` protocol
//! - [`HttpTransport`]: reqwest transport for the hosted agent
//! - [`ChatConfig`]: layered configuration (defaults, file, env, CLI)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use weather_chat_core::{
//!     load_config, ConversationStore, HttpTransport, WeatherRequestBuilder,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let transport = Arc::new(HttpTransport::from_config(&config)?);
//!     let builder = Arc::new(WeatherRequestBuilder::new(config.request.clone()));
//!     let mut store = ConversationStore::new(transport, builder, config.store.clone());
//!
//!     store.send_message("What's the weather in Oslo?")?;
//!     store.drive_to_completion().await;
//!
//!     for message in store.active_messages() {
//!         println!("{}: {}", message.role.as_str(), message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: request builder and transport collaborators
//! - [`config`]: configuration loading
//! - [`error`]: transport and store errors
//! - [`ids`]: injectable id generation
//! - [`messages`]: ids, roles, statuses and surface notifications
//! - [`store`]: the conversation store and thread export
//! - [`streaming`]: response body decoding
//! - [`thread`]: threads and messages

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod ids;
pub mod messages;
pub mod store;
pub mod streaming;
pub mod thread;

// Re-exports for convenience
pub use backend::{
    ByteStream, ChatTransport, HistoryEntry, HttpTransport, RequestBuilder, WeatherRequestBuilder,
};
pub use error::{StoreError, TransportError};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use messages::{ChatNotification, MessageId, MessageRole, MessageStatus, ThreadId};
pub use store::{ConversationState, ConversationStore, ExportedThread, ThreadExport};
pub use streaming::{StreamDecoder, StreamEvent};
pub use thread::{derive_title, Message, MessageUpdate, Thread};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ChatConfig, ConfigError,
    ConfigOverrides, ConfigSource, EndpointConfig, RequestDefaults, StoreConfig,
};
