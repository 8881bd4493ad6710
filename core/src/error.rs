//! Error types delivered to request error listeners.
//!
//! # Design
//! `Unauthorized` gets a dedicated variant because the client also notifies
//! its auth-failure listener for it. All other non-2xx responses land in
//! `Http` with the raw status code and body. `Transport` and `Cancelled` are
//! reported by the queue, never produced by response classification.

use thiserror::Error;

/// Errors handed to a `RestRequest` error listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestError {
    /// The server rejected the access token.
    #[error("authentication failed (HTTP {status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// The server returned a non-2xx status that is not an auth failure.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A 2xx response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The queue could not complete the round-trip.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,
}

impl RestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Unauthorized { status, .. } | RestError::Http { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Details passed to the auth-failure listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub status: u16,
    /// The `error` field of the response body, when present.
    pub code: Option<String>,
    /// The `message` field of the response body, when present.
    pub message: Option<String>,
}
