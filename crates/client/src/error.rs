//! Client-side error model.

use thiserror::Error;

use crate::store::StoreError;

/// Result type used across the client crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures surfaced to callers of the session lifecycle.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Login/registration rejected by the remote service. Carries the
    /// remote-provided message when one could be extracted, else a generic
    /// fallback. Never retried automatically.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Secure storage backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport-level failure on an outbound call.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Session payload could not be serialized for persistence.
    #[error("session payload serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }
}
