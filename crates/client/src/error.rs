//! Unified error handling for the client.
//!
//! Every fallible client operation returns `Result<T, ClientError>`. The
//! variants follow the failure taxonomy: transport failures, non-2xx
//! statuses, and client-side validation failures that never reach the
//! network.

use reqwest::StatusCode;
use thiserror::Error;

use dwa_core::ValidationError;

use crate::storage::StorageError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request failed"))]
    Status {
        /// Response status code.
        status: StatusCode,
        /// Backend error message (`err` field of the body), if any.
        message: Option<String>,
    },

    /// A request body could not be serialized; nothing was sent.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A form failed validation before any request was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reading or writing the persisted session failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// A request path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// The HTTP status, for status failures.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the session (401).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// A message suitable for showing inline next to the view that failed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "Your session has expired, please sign in again".to_string()
            }
            Self::Status { status, .. } if status.is_server_error() => {
                "The server ran into a problem, please try again".to_string()
            }
            Self::Transport(_) => "Could not reach the server".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::NotAuthenticated => "Please sign in first".to_string(),
            _ => "Something went wrong".to_string(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
