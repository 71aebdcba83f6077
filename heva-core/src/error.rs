//! Core error types for HEVA.

use thiserror::Error;

/// Core error type for HEVA operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Unknown or unsupported HTTP method.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
