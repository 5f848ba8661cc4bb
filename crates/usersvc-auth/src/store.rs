//! User store abstraction and in-memory implementation

use crate::error::{Result, UserServiceError};
use crate::user::{DEFAULT_TOKEN_LENGTH, User, generate_token};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;

/// Lookup of user accounts
///
/// Implementations own credential verification and one-time token
/// bookkeeping; the user service only calls these methods.
pub trait UserDao: Send + Sync {
    /// Return the user matching the login and password, if any
    fn user_by_credentials(&self, login: &str, password: &str) -> Result<Option<User>>;

    /// Return the user owning a one-time login token, if any
    fn user_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Invalidate a one-time login token
    fn discard_token(&self, token: &str) -> Result<()>;

    /// Return the user with the given identifier, if any
    fn user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Return the user with the given login, if any
    fn user_by_login(&self, login: &str) -> Result<Option<User>>;
}

struct StoredUser {
    user: User,
    password_hash: String,
}

/// In-memory user store
///
/// Passwords are kept as Argon2 PHC strings with a random salt per user.
/// One-time tokens are consumed by the first successful lookup.
pub struct InMemoryUserStore {
    /// Users indexed by id
    users: RwLock<HashMap<String, StoredUser>>,
    /// One-time tokens mapped to the owning user id
    tokens: RwLock<HashMap<String, String>>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    /// Create a new empty user store
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store seeded from configuration
    pub fn from_seed(seed: &[usersvc_common::SeedUser]) -> Result<Self> {
        let store = Self::new();
        for entry in seed {
            let mut user = User::new(&entry.id, &entry.login);
            user.email.clone_from(&entry.email);
            user.full_name.clone_from(&entry.full_name);
            store.create_user(user, &entry.password)?;
        }
        Ok(store)
    }

    // =========== User Operations ===========

    /// Add a user with the given password
    pub fn create_user(&self, user: User, password: &str) -> Result<User> {
        let mut users = self.users.write();

        if users.contains_key(&user.id) {
            return Err(UserServiceError::store(format!(
                "user id already exists: {}",
                user.id
            )));
        }
        if users.values().any(|u| u.user.login == user.login) {
            return Err(UserServiceError::store(format!(
                "user login already exists: {}",
                user.login
            )));
        }

        let password_hash = hash_password(password)?;
        users.insert(
            user.id.clone(),
            StoredUser {
                user: user.clone(),
                password_hash,
            },
        );

        Ok(user)
    }

    /// Replace a user's password
    pub fn set_password(&self, login: &str, password: &str) -> Result<()> {
        let mut users = self.users.write();
        let stored = users
            .values_mut()
            .find(|u| u.user.login == login)
            .ok_or_else(|| UserServiceError::UnknownUser(login.to_string()))?;
        stored.password_hash = hash_password(password)?;
        Ok(())
    }

    /// Number of users in the store
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Check if the store has no users
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    // =========== Token Operations ===========

    /// Issue a one-time login token for a user
    pub fn issue_token(&self, login: &str) -> Result<String> {
        let user = self
            .user_by_login(login)?
            .ok_or_else(|| UserServiceError::UnknownUser(login.to_string()))?;

        let token = generate_token(DEFAULT_TOKEN_LENGTH);
        self.tokens.write().insert(token.clone(), user.id);
        Ok(token)
    }

    /// Number of outstanding one-time tokens
    pub fn pending_tokens(&self) -> usize {
        self.tokens.read().len()
    }

    /// Outstanding one-time tokens, mapped to user ids
    pub fn export_tokens(&self) -> HashMap<String, String> {
        self.tokens.read().clone()
    }

    /// Restore one-time tokens, skipping those whose user is unknown
    pub fn import_tokens(&self, tokens: HashMap<String, String>) {
        let users = self.users.read();
        self.tokens.write().extend(
            tokens
                .into_iter()
                .filter(|(_, user_id)| users.contains_key(user_id)),
        );
    }
}

impl UserDao for InMemoryUserStore {
    fn user_by_credentials(&self, login: &str, password: &str) -> Result<Option<User>> {
        let users = self.users.read();
        let Some(stored) = users.values().find(|u| u.user.login == login) else {
            return Ok(None);
        };
        Ok(verify_password(&stored.password_hash, password).then(|| stored.user.clone()))
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let Some(user_id) = self.tokens.write().remove(token) else {
            return Ok(None);
        };
        self.user_by_id(&user_id)
    }

    fn discard_token(&self, token: &str) -> Result<()> {
        self.tokens.write().remove(token);
        Ok(())
    }

    fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).map(|u| u.user.clone()))
    }

    fn user_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.user.login == login)
            .map(|u| u.user.clone()))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| UserServiceError::store(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserServiceError::store(e.to_string()))?;
    Ok(phc.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_alice() -> InMemoryUserStore {
        let store = InMemoryUserStore::new();
        store.create_user(User::new("1", "alice"), "pw").unwrap();
        store
    }

    #[test]
    fn test_credentials_lookup() {
        let store = store_with_alice();
        let user = store.user_by_credentials("alice", "pw").unwrap().unwrap();
        assert_eq!(user.id, "1");

        assert!(store.user_by_credentials("alice", "wrong").unwrap().is_none());
        assert!(store.user_by_credentials("nobody", "pw").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_login() {
        let store = store_with_alice();
        let result = store.create_user(User::new("2", "alice"), "other");
        assert!(matches!(result, Err(UserServiceError::Store(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lookup_by_id_and_login() {
        let store = store_with_alice();
        assert_eq!(store.user_by_id("1").unwrap().unwrap().login, "alice");
        assert_eq!(store.user_by_login("alice").unwrap().unwrap().id, "1");
        assert!(store.user_by_id("2").unwrap().is_none());
    }

    #[test]
    fn test_set_password() {
        let store = store_with_alice();
        store.set_password("alice", "new").unwrap();
        assert!(store.user_by_credentials("alice", "pw").unwrap().is_none());
        assert!(store.user_by_credentials("alice", "new").unwrap().is_some());
        assert!(matches!(
            store.set_password("bob", "x"),
            Err(UserServiceError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_token_is_single_use() {
        let store = store_with_alice();
        let token = store.issue_token("alice").unwrap();
        assert_eq!(store.pending_tokens(), 1);

        let user = store.user_by_token(&token).unwrap().unwrap();
        assert_eq!(user.login, "alice");
        assert!(store.user_by_token(&token).unwrap().is_none());
        assert_eq!(store.pending_tokens(), 0);
    }

    #[test]
    fn test_discard_token() {
        let store = store_with_alice();
        let token = store.issue_token("alice").unwrap();
        store.discard_token(&token).unwrap();
        assert!(store.user_by_token(&token).unwrap().is_none());
    }

    #[test]
    fn test_token_export_import() {
        let store = store_with_alice();
        let token = store.issue_token("alice").unwrap();

        let mut exported = store.export_tokens();
        exported.insert("orphan".to_string(), "404".to_string());

        let restored = store_with_alice();
        restored.import_tokens(exported);
        assert_eq!(restored.pending_tokens(), 1);
        assert_eq!(restored.user_by_token(&token).unwrap().unwrap().id, "1");
    }

    #[test]
    fn test_passwords_are_salted_argon2() {
        let store = store_with_alice();
        store.create_user(User::new("2", "bob"), "pw").unwrap();

        let users = store.users.read();
        let alice = &users["1"].password_hash;
        let bob = &users["2"].password_hash;
        assert!(alice.starts_with("$argon2id$"));
        assert_ne!(alice, bob);
        assert!(!alice.contains("pw"));
    }

    #[test]
    fn test_from_seed() {
        let seed = vec![usersvc_common::SeedUser {
            id: "9".to_string(),
            login: "dave".to_string(),
            password: "secret".to_string(),
            email: Some("dave@example.com".to_string()),
            full_name: None,
        }];
        let store = InMemoryUserStore::from_seed(&seed).unwrap();
        let user = store.user_by_credentials("dave", "secret").unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("dave@example.com"));
    }
}
