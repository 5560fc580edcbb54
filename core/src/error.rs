//! Error types for the HealthCloud client.
//!
//! # Design
//! Local failures (`MissingField`, `MissingConfig`, `Io`) are raised before
//! any request leaves the process. Remote failures land in `Http` with the
//! raw status code and body; the client never interprets or retries them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by every resource operation.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required payload field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A required environment variable was not set.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// An attachment file could not be read.
    #[error("cannot read attachment '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request could not be executed (DNS, connect, TLS, read failures).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Status code of a remote failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised locally, before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::MissingField(_)
                | ApiError::MissingConfig(_)
                | ApiError::Io { .. }
                | ApiError::Serialization(_)
        )
    }
}
