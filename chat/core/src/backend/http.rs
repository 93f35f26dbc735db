//! HTTP Transport
//!
//! POSTs the payload as JSON to the configured agent endpoint and streams the
//! chunked response body back unchanged.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use serde_json::Value;

use super::traits::{ByteStream, ChatTransport};
use crate::config::{ChatConfig, EndpointConfig};
use crate::error::TransportError;

/// Header the hosted agent expects from playground clients
const PLAYGROUND_HEADER: &str = "x-mastra-dev-playground";

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    /// Endpoint settings
    endpoint: EndpointConfig,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `endpoint`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(endpoint: EndpointConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = endpoint.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Create from the endpoint section of a loaded configuration
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::new`].
    pub fn from_config(config: &ChatConfig) -> Result<Self, TransportError> {
        Self::new(config.endpoint.clone())
    }

    /// Endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.endpoint.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn open_stream(&self, payload: &Value) -> Result<ByteStream, TransportError> {
        let mut request = self
            .http_client
            .post(&self.endpoint.url)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, &self.endpoint.accept_language)
            .json(payload);

        if self.endpoint.playground_header {
            request = request.header(PLAYGROUND_HEADER, "true");
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let reason = match status.canonical_reason() {
                Some(reason) => reason.to_string(),
                None => response.text().await.unwrap_or_default(),
            };
            tracing::warn!(status = status.as_u16(), url = %self.endpoint.url, "Agent returned error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        tracing::debug!(url = %self.endpoint.url, "Response stream opened");

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::StreamRead(e.to_string()))
        });

        Ok(Box::pin(stream))
    }
}
