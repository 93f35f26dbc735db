//! Error types
//!
//! [`TransportError`] covers everything that can go wrong between building a
//! request and the last byte of the response. [`StoreError`] covers operations
//! the store refuses; those never touch state.

use thiserror::Error;

use crate::messages::ThreadId;

/// Errors from building, sending or reading a streamed request
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint answered with a non-success status
    #[error("HTTP {status}: {reason}")]
    Status {
        /// Numeric status code
        status: u16,
        /// Canonical reason phrase (or response body when none exists)
        reason: String,
    },

    /// The request could not be sent
    #[error("Network error: {0}")]
    Network(String),

    /// Reading the response body failed mid-stream
    #[error("Stream read failed: {0}")]
    StreamRead(String),
}

/// Operations the store rejects without changing state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Message was empty after trimming
    #[error("message is empty")]
    EmptyInput,

    /// A send is already in flight
    #[error("a message is already being sent")]
    ConcurrentSendRejected,

    /// No thread with this id exists
    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = TransportError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::ThreadNotFound(ThreadId::from("t-9"));
        assert_eq!(err.to_string(), "thread not found: t-9");
    }
}
