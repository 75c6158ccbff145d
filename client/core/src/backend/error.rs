//! Backend Errors

use thiserror::Error;

/// Errors from talking to the inference backend
///
/// Only request-level and stream-level failures appear here. A single
/// malformed frame inside an otherwise healthy stream is not an error; the
/// decoder logs and skips it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered with a non-success HTTP status
    #[error("Failed to {operation}: {status} {status_text}")]
    Status {
        /// What the client was trying to do
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status code
        ///
        /// The HTTP client does not expose the phrase the server actually
        /// sent, so this is the standard phrase for `status` (`"Unknown"` for
        /// codes without one), not the server's text verbatim.
        status_text: String,
    },

    /// Response carried no readable body
    #[error("No response body stream available")]
    NoStream,

    /// Connection-level failure before a response arrived
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The byte source failed after streaming began
    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    /// The connection closed before the end-of-stream sentinel or a final chunk
    #[error("Stream ended before the response was complete")]
    UnexpectedEof,

    /// A non-streaming response body could not be decoded
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl BackendError {
    /// Build a status error from an HTTP status code
    pub(crate) fn status(operation: &'static str, status: reqwest::StatusCode) -> Self {
        Self::Status {
            operation,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// HTTP status code, when the failure was a status error
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that happened after some of the stream was consumed
    #[must_use]
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::UnexpectedEof)
    }
}
