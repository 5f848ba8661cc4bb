//! Remember-me authentication provider
//!
//! Registered both as a provider and as a listener. On login, when the
//! activation condition holds, it issues a random token, stores it with an
//! expiry and sets it as a cookie. On later requests without a session
//! identity it exchanges the cookie for the user, logs them in and pushes
//! the expiry forward while keeping the same token. Logging out clears the
//! cookie.

use chrono::{DateTime, Utc};
use cookie::time::{OffsetDateTime, PrimitiveDateTime};
use cookie::{Cookie, SameSite};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use usersvc_common::{CookieLifetime, RememberMeConfig};

use crate::condition::{Condition, RequestParamCondition};
use crate::context::RequestContext;
use crate::error::{Result, UserServiceError};
use crate::listener::AuthListener;
use crate::provider::AuthProvider;
use crate::service::UserService;
use crate::user::{DEFAULT_TOKEN_LENGTH, User, generate_token};

/// Storage of remember-me tokens
///
/// A token is bound to exactly one user; storing a new token for a user
/// replaces the previous one.
pub trait RememberMeStore: Send + Sync {
    /// The user owning an unexpired token, if any
    fn user_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Bind a token to a user until `expires_at`
    fn set_token(&self, user: &User, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Forget a token. Stores that let tokens expire on their own can
    /// ignore this.
    fn discard_token(&self, _token: &str) -> Result<()> {
        Ok(())
    }
}

/// A stored remember-me token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberMeEntry {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// In-memory remember-me token store
#[derive(Debug, Default)]
pub struct InMemoryRememberMeStore {
    /// Entries indexed by token
    entries: RwLock<HashMap<String, RememberMeEntry>>,
}

impl InMemoryRememberMeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from saved entries, dropping expired ones
    pub fn from_entries(entries: Vec<RememberMeEntry>) -> Self {
        let now = Utc::now();
        let entries = entries
            .into_iter()
            .filter(|e| e.expires_at > now)
            .map(|e| (e.token.clone(), e))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// All stored entries
    pub fn entries(&self) -> Vec<RememberMeEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// The entry for a token, expired or not
    pub fn entry(&self, token: &str) -> Option<RememberMeEntry> {
        self.entries.read().get(token).cloned()
    }

    /// Number of stored tokens
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store holds no token
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl RememberMeStore for InMemoryRememberMeStore {
    fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let mut entries = self.entries.write();
        match entries.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.user.clone())),
            Some(_) => {
                entries.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_token(&self, user: &User, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.write();
        entries.retain(|t, e| e.user.id != user.id || t == token);
        entries.insert(
            token.to_string(),
            RememberMeEntry {
                token: token.to_string(),
                user: user.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn discard_token(&self, token: &str) -> Result<()> {
        self.entries.write().remove(token);
        Ok(())
    }
}

/// Provider and listener implementing "remember me"
pub struct RememberMeAuthProvider {
    store: Arc<dyn RememberMeStore>,
    expire: CookieLifetime,
    path: String,
    cookie_name: String,
    secure: bool,
    activate: Arc<dyn Condition>,
    token_length: usize,
}

impl RememberMeAuthProvider {
    /// Create a remember-me provider
    ///
    /// `activate` decides, at login time, whether a token is issued.
    pub fn new(
        store: Arc<dyn RememberMeStore>,
        expire: CookieLifetime,
        path: impl Into<String>,
        cookie_name: impl Into<String>,
        activate: Arc<dyn Condition>,
    ) -> Self {
        Self {
            store,
            expire,
            path: path.into(),
            cookie_name: cookie_name.into(),
            secure: false,
            activate,
            token_length: DEFAULT_TOKEN_LENGTH,
        }
    }

    /// Create a provider activated by the configured request parameter
    pub fn from_config(store: Arc<dyn RememberMeStore>, config: &RememberMeConfig) -> Self {
        let activate = RequestParamCondition::new(&config.activate_param, &config.activate_value);
        Self::new(
            store,
            config.expire,
            &config.path,
            &config.cookie_name,
            Arc::new(activate),
        )
        .with_token_length(config.token_length)
        .with_secure(config.secure)
    }

    /// Only send the cookie over HTTPS
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Length of generated tokens
    #[must_use]
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Name of the cookie carrying the token
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Resolve the cookie token and log its owner in
    ///
    /// Returns the owner together with the token the request carried. An
    /// absent, unknown or expired token, or a token whose owner is gone
    /// from the user store, means nobody is remembered.
    fn user_from_cookie(
        &self,
        service: &UserService,
        ctx: &RequestContext,
    ) -> Result<Option<(User, String)>> {
        let Some(token) = ctx.cookies().get(&self.cookie_name) else {
            return Ok(None);
        };

        let user = match self.store.user_by_token(&token) {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("Remember-me token not recognized");
                return Ok(None);
            }
            Err(e) => {
                warn!("Remember-me token lookup failed: {}", e);
                return Ok(None);
            }
        };

        match service.login_without_password(ctx, &user.login) {
            Ok(()) => Ok(Some((user, token))),
            Err(UserServiceError::UnknownUser(login)) => {
                warn!(login = %login, "Remember-me token owner no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store the token with a fresh expiry and set the cookie
    fn refresh_cookie(&self, user: &User, ctx: &RequestContext, token: String) -> Result<()> {
        let expires = self.expire.expires_from(Utc::now());
        self.store.set_token(user, &token, expires)?;

        let cookie = Cookie::build((self.cookie_name.clone(), token))
            .path(self.path.clone())
            .expires(cookie_expiry(expires))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build();
        ctx.cookies().add(cookie);
        Ok(())
    }
}

/// Convert an expiry instant to the cookie's date type, clamping past its range
fn cookie_expiry(at: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .unwrap_or_else(|_| PrimitiveDateTime::MAX.assume_utc())
}

impl AuthProvider for RememberMeAuthProvider {
    fn name(&self) -> &str {
        "remember-me"
    }

    fn is_logged(&self, service: &UserService, ctx: &RequestContext) -> Result<bool> {
        match self.user_from_cookie(service, ctx)? {
            Some((user, token)) => {
                self.refresh_cookie(&user, ctx, token)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn user_id(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>> {
        Ok(self.user_from_cookie(service, ctx)?.map(|(u, _)| u.id))
    }

    fn user_login(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>> {
        Ok(self.user_from_cookie(service, ctx)?.map(|(u, _)| u.login))
    }

    fn logged_user(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<User>> {
        Ok(self.user_from_cookie(service, ctx)?.map(|(u, _)| u))
    }
}

impl AuthListener for RememberMeAuthProvider {
    fn name(&self) -> &str {
        "remember-me"
    }

    fn after_log_in(&self, service: &UserService, ctx: &RequestContext) -> Result<()> {
        // A login made while resolving the cookie keeps the cookie's token
        if ctx.is_resolving() || !self.activate.is_ok(service, ctx)? {
            return Ok(());
        }
        if let Some(user) = service.logged_user(ctx)? {
            debug!(login = %user.login, "Issuing remember-me token");
            self.refresh_cookie(&user, ctx, generate_token(self.token_length))?;
        }
        Ok(())
    }

    fn before_log_out(&self, _service: &UserService, ctx: &RequestContext) -> Result<()> {
        if let Some(token) = ctx.cookies().get(&self.cookie_name) {
            self.store.discard_token(&token)?;
            ctx.cookies().remove(&self.cookie_name, &self.path);
        }
        Ok(())
    }
}
