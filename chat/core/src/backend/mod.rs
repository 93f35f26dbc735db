//! Agent Backend Integration
//!
//! Collaborators the store uses to reach the weather agent: a request
//! builder producing the payload and a transport streaming the response.
//!
//! # Usage
//!
//! ```ignore
//! use weather_chat_core::backend::{ChatTransport, HttpTransport, RequestBuilder, WeatherRequestBuilder};
//!
//! let config = weather_chat_core::load_config()?;
//! let builder = WeatherRequestBuilder::new(config.request.clone());
//! let transport = HttpTransport::from_config(&config)?;
//! let payload = builder.build("Weather in Lima?", &[])?;
//! let body = transport.open_stream(&payload).await?;
//! ```

mod http;
mod request;
mod traits;

pub use http::HttpTransport;
pub use request::WeatherRequestBuilder;
pub use traits::{ByteStream, ChatTransport, HistoryEntry, RequestBuilder};
