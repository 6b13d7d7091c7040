//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain-level error.
///
/// Keep this focused on deterministic domain failures (validation,
/// invariants). Transport and storage concerns belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
