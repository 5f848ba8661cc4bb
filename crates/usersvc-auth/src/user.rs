//! User record and token types

use serde::{Deserialize, Serialize};

/// Alphabet for generated tokens
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of remember-me and one-time login tokens
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// A user account as returned by the user store
///
/// This is an immutable snapshot: the service reads it but never changes
/// it. Identifiers are always strings; stores with numeric keys format them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Login name
    pub login: String,
    /// Email address (optional)
    pub email: Option<String>,
    /// Full display name (optional)
    pub full_name: Option<String>,
}

impl User {
    /// Create a user with the given identifier and login
    pub fn new(id: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: login.into(),
            email: None,
            full_name: None,
        }
    }

    /// Set email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set full name
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Name to show in UIs: the full name when known, else the login
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.login)
    }
}

/// Generate a random alphanumeric token
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_CHARSET.len());
            TOKEN_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_builder() {
        let user = User::new("1", "alice")
            .with_email("alice@example.com")
            .with_full_name("Alice Liddell");

        assert_eq!(user.id, "1");
        assert_eq!(user.login, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.display_name(), "Alice Liddell");
    }

    #[test]
    fn test_display_name_falls_back_to_login() {
        let user = User::new("2", "bob");
        assert_eq!(user.display_name(), "bob");
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token(DEFAULT_TOKEN_LENGTH);
        assert_eq!(token.len(), DEFAULT_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token(DEFAULT_TOKEN_LENGTH));
    }

    #[test]
    fn test_user_serialization() {
        let user = User::new("7", "carol").with_email("carol@example.com");
        let json = serde_json::to_string(&user).unwrap();
        let parsed: User = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, user);
    }
}
