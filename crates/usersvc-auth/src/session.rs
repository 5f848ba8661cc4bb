//! Client session handle and session manager
//!
//! A [`Session`] is the host-owned key/value store for one client. It is
//! "started" once it carries an identifier. The user service never starts
//! one itself: it either finds it already started or asks a
//! [`SessionManager`] to do so.

use crate::error::Result;
use crate::user::generate_token;
use derive_more::Display;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Length of generated session identifiers
const SESSION_ID_LENGTH: usize = 40;

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session id from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random session id
    pub fn generate() -> Self {
        Self(generate_token(SESSION_ID_LENGTH))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Serializable form of a session, for hosts that persist it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Option<SessionId>,
    pub values: HashMap<String, String>,
}

/// Per-client key/value session
#[derive(Debug, Default)]
pub struct Session {
    id: RwLock<Option<SessionId>>,
    values: RwLock<HashMap<String, String>>,
}

impl Session {
    /// Create a session that has not been started
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an already started session
    pub fn started(id: SessionId) -> Self {
        Self {
            id: RwLock::new(Some(id)),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Restore a session from a snapshot
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            id: RwLock::new(snapshot.id),
            values: RwLock::new(snapshot.values),
        }
    }

    /// Capture the current id and values
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.read().clone(),
            values: self.values.read().clone(),
        }
    }

    /// Check whether the session has been started
    pub fn is_started(&self) -> bool {
        self.id.read().is_some()
    }

    /// Current session id, if started
    pub fn id(&self) -> Option<SessionId> {
        self.id.read().clone()
    }

    /// Assign the session id, starting the session if needed
    pub fn set_id(&self, id: SessionId) {
        *self.id.write() = Some(id);
    }

    /// Read a value
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Write a value
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove a value, returning it
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

/// Host mechanism that starts sessions and rotates their identifiers
pub trait SessionManager: Send + Sync {
    /// Start the session
    fn start(&self, session: &Session) -> Result<()>;

    /// Replace the session id while keeping its values
    fn regenerate_id(&self, session: &Session) -> Result<()>;
}

/// Session manager issuing random identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionManager;

impl SessionManager for DefaultSessionManager {
    fn start(&self, session: &Session) -> Result<()> {
        if !session.is_started() {
            let id = SessionId::generate();
            tracing::debug!("Starting session {}", id);
            session.set_id(id);
        }
        Ok(())
    }

    fn regenerate_id(&self, session: &Session) -> Result<()> {
        session.set_id(SessionId::generate());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_not_started() {
        let session = Session::new();
        assert!(!session.is_started());
        assert!(session.id().is_none());
    }

    #[test]
    fn test_values() {
        let session = Session::started(SessionId::new("abc"));
        session.insert("k", "v");
        assert!(session.contains("k"));
        assert_eq!(session.get("k").as_deref(), Some("v"));
        assert_eq!(session.remove("k").as_deref(), Some("v"));
        assert!(session.get("k").is_none());
    }

    #[test]
    fn test_default_manager_starts_once() {
        let session = Session::new();
        DefaultSessionManager.start(&session).unwrap();
        let first = session.id().unwrap();
        assert_eq!(first.as_str().len(), SESSION_ID_LENGTH);

        DefaultSessionManager.start(&session).unwrap();
        assert_eq!(session.id().unwrap(), first);
    }

    #[test]
    fn test_regenerate_keeps_values() {
        let session = Session::started(SessionId::new("fixated"));
        session.insert("k", "v");

        DefaultSessionManager.regenerate_id(&session).unwrap();
        assert_ne!(session.id().unwrap().as_str(), "fixated");
        assert_eq!(session.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_snapshot_restore() {
        let session = Session::started(SessionId::new("s1"));
        session.insert("a", "1");

        let json = serde_json::to_string(&session.snapshot()).unwrap();
        let restored = Session::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.id().unwrap().to_string(), "s1");
        assert_eq!(restored.get("a").as_deref(), Some("1"));
    }
}
