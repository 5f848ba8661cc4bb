//! User service error types

use thiserror::Error;

/// Errors raised by the user service and its collaborators
///
/// A credential mismatch is not an error: `login` reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("the session must be initialized before trying to {operation}")]
    SessionNotInitialized { operation: &'static str },

    #[error("unable to find user whose login is {0}")]
    UnknownUser(String),

    #[error("no user logged")]
    NoUserLogged,

    #[error("user store error: {0}")]
    Store(String),

    #[error("authentication provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Config(#[from] usersvc_common::Error),
}

impl UserServiceError {
    /// Create a user store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}

/// Result type for user service operations
pub type Result<T> = std::result::Result<T, UserServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_initialized_names_operation() {
        let err = UserServiceError::SessionNotInitialized { operation: "login" };
        assert_eq!(
            err.to_string(),
            "the session must be initialized before trying to login"
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = UserServiceError::provider("remember-me", "store offline");
        assert!(err.to_string().contains("remember-me"));
        assert!(err.to_string().contains("store offline"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: UserServiceError = usersvc_common::Error::configuration("bad").into();
        assert_eq!(err.to_string(), "configuration error: bad");
    }
}
