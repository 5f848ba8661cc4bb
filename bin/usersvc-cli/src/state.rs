//! Client state persisted between invocations
//!
//! Each CLI invocation plays one HTTP request. What a browser and a server
//! would keep between requests (the session, the cookies, the stored
//! tokens) lives in a JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use usersvc_auth::{RememberMeEntry, SessionSnapshot};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientState {
    /// Server-side session of this client
    pub session: SessionSnapshot,
    /// Cookies held by the client
    pub cookies: HashMap<String, String>,
    /// Server-side remember-me tokens
    pub remember_me: Vec<RememberMeEntry>,
    /// Server-side one-time login tokens, mapped to user ids
    pub login_tokens: HashMap<String, String>,
}

impl ClientState {
    /// Load the state file, starting fresh when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No state file at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse state file {}", path.display()))
    }

    /// Write the state file
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write state file {}", path.display()))
    }

    /// Forget the session, as a browser does when it is closed
    pub fn drop_session(&mut self) {
        self.session = SessionSnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usersvc_auth::SessionId;

    #[test]
    fn test_missing_file_is_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = ClientState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.session.id.is_none());
        assert!(state.cookies.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = ClientState::default();
        state.session.id = Some(SessionId::new("s1"));
        state.session.values.insert("userId".to_string(), "1".to_string());
        state.cookies.insert("remember_me".to_string(), "tok".to_string());
        state.save(&path).unwrap();

        let loaded = ClientState::load(&path).unwrap();
        assert_eq!(loaded.session, state.session);
        assert_eq!(loaded.cookies.get("remember_me").map(String::as_str), Some("tok"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = ClientState::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse state file"));
    }

    #[test]
    fn test_drop_session_keeps_cookies() {
        let mut state = ClientState::default();
        state.session.id = Some(SessionId::new("s1"));
        state.cookies.insert("c".to_string(), "v".to_string());

        state.drop_session();
        assert!(state.session.id.is_none());
        assert_eq!(state.cookies.len(), 1);
    }
}
