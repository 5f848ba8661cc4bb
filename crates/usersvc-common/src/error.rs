//! Error types for usersvc configuration
//!
//! This module defines the common error types used while loading and
//! validating configuration.

use thiserror::Error;

/// Common result type for usersvc configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for usersvc
#[derive(Debug, Error)]
pub enum Error {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid cookie lifetime: {0}")]
    InvalidLifetime(String),
}

impl Error {
    /// Create a new configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid lifetime error
    pub fn invalid_lifetime(msg: impl Into<String>) -> Self {
        Self::InvalidLifetime(msg.into())
    }

    /// Check if this error came from the filesystem rather than the content
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
