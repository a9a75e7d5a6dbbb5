//! Error types for the backend API client.
//!
//! # Design
//! Callers only ever see a message, so `ApiError`'s `Display` output is the
//! exact user-facing text. The variants exist so code can still branch on the
//! failure class (timeout vs. unreachable vs. rejected) without string matching.
//!
//! `TransportError` is the narrower vocabulary a transport uses for failures
//! that never produced an HTTP response; the client translates it into
//! `ApiError` using the configured base URL.

use thiserror::Error;

/// Errors returned by `BackendApiClient`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request did not settle within the configured timeout.
    #[error("Request timeout while connecting to backend API.")]
    Timeout,

    /// The request never reached an HTTP server (refused, DNS, unreachable).
    #[error("Cannot connect to backend API at {base_url}. Please make sure localhost:8000 is running.")]
    Connection { base_url: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The path or query could not be turned into a valid URL.
    #[error("{0}")]
    InvalidUrl(String),

    /// A JSON response body could not be parsed.
    #[error("{0}")]
    Deserialization(String),

    /// A request payload could not be serialized to JSON.
    #[error("{0}")]
    Serialization(String),

    /// Any other transport failure, carrying its original message.
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    /// The human-readable message shown to users.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures reported by a [`Transport`](crate::transport::Transport) before any
/// HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}
