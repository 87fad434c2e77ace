//! Error types for the bookdesk client.
//!
//! # Design
//! Every non-success HTTP status lands in `Http` with the status code, the
//! requested URL and the raw body, so callers can show the server's own
//! explanation. Transport failures (refused connection, timeout) are kept
//! apart in `Network` because health checks treat them as "down" rather
//! than as an answer from the service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with status >= 400.
    #[error("HTTP {status} from {url}\nBody: {body}")]
    Http { status: u16, url: String, body: String },

    /// The request never produced a response (connect failure, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The operation is not possible with the current session.
    #[error("{0}")]
    IllegalState(&'static str),

    /// The catalog document is not well-formed XML.
    #[error("malformed catalog XML: {0}")]
    Decode(String),

    /// A base URL could not be combined with an endpoint path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Status code carried by an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
