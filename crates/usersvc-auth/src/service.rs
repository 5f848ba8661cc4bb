//! The user service
//!
//! [`UserService`] logs users in and off and answers "who is the current
//! user". The primary identity lives in two session keys; when they are
//! absent the registered [`AuthProvider`]s are consulted in order.
//!
//! Per session the service moves between two states:
//!
//! ```text
//! Anonymous --login / login_without_password / login_via_token--> Authenticated
//! Authenticated --logoff--> Anonymous
//! Authenticated --login as someone else--> (logoff) --> Authenticated
//! ```

use std::sync::Arc;

use tracing::debug;
use usersvc_common::UserServiceConfig;

use crate::chain::{AuthListenerChain, AuthProviderChain};
use crate::context::RequestContext;
use crate::error::{Result, UserServiceError};
use crate::listener::AuthListener;
use crate::provider::AuthProvider;
use crate::session::{DefaultSessionManager, SessionManager};
use crate::store::UserDao;
use crate::user::User;

/// Session key holding the logged user's id (after the prefix)
pub const USER_ID_KEY: &str = "userId";
/// Session key holding the logged user's login (after the prefix)
pub const USER_LOGIN_KEY: &str = "userLogin";

/// Logs users in and off and resolves the current identity
pub struct UserService {
    user_dao: Arc<dyn UserDao>,
    session_manager: Option<Arc<dyn SessionManager>>,
    session_prefix: String,
    providers: AuthProviderChain,
    listeners: AuthListenerChain,
}

impl UserService {
    /// Create a service without session manager and with an empty prefix
    ///
    /// Without a session manager every operation requires the request's
    /// session to be started already.
    pub fn new(user_dao: Arc<dyn UserDao>) -> Self {
        Self {
            user_dao,
            session_manager: None,
            session_prefix: String::new(),
            providers: AuthProviderChain::new(),
            listeners: AuthListenerChain::new(),
        }
    }

    /// Create a service from configuration
    pub fn from_config(user_dao: Arc<dyn UserDao>, config: &UserServiceConfig) -> Self {
        let service = Self::new(user_dao).with_session_prefix(&config.session_prefix);
        if config.auto_start_session {
            service.with_session_manager(Arc::new(DefaultSessionManager))
        } else {
            service
        }
    }

    /// Use a session manager to start sessions and rotate their ids
    #[must_use]
    pub fn with_session_manager(mut self, manager: Arc<dyn SessionManager>) -> Self {
        self.session_manager = Some(manager);
        self
    }

    /// Prefix the session keys, for applications sharing one session
    #[must_use]
    pub fn with_session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = prefix.into();
        self
    }

    /// The user store
    pub fn user_dao(&self) -> &Arc<dyn UserDao> {
        &self.user_dao
    }

    /// The session key prefix
    pub fn session_prefix(&self) -> &str {
        &self.session_prefix
    }

    /// Full session key for one of [`USER_ID_KEY`] / [`USER_LOGIN_KEY`]
    pub fn session_key(&self, name: &str) -> String {
        format!("{}{}", self.session_prefix, name)
    }

    // =========== Registration ===========

    /// Replace the authentication providers
    pub fn set_auth_providers(&mut self, providers: Vec<Arc<dyn AuthProvider>>) {
        self.providers.replace(providers);
    }

    /// Append an authentication provider
    pub fn add_auth_provider(&mut self, provider: Arc<dyn AuthProvider>) {
        self.providers.add_arc(provider);
    }

    /// Replace the authentication listeners
    pub fn set_auth_listeners(&mut self, listeners: Vec<Arc<dyn AuthListener>>) {
        self.listeners.replace(listeners);
    }

    /// Append an authentication listener
    pub fn add_auth_listener(&mut self, listener: Arc<dyn AuthListener>) {
        self.listeners.add_arc(listener);
    }

    /// Registered providers
    pub fn providers(&self) -> &AuthProviderChain {
        &self.providers
    }

    /// Registered listeners
    pub fn listeners(&self) -> &AuthListenerChain {
        &self.listeners
    }

    // =========== Login / Logoff ===========

    /// Log a user in with login and password
    ///
    /// Returns `Ok(false)` when the credentials do not match; the current
    /// identity is then left untouched.
    pub fn login(&self, ctx: &RequestContext, login: &str, password: &str) -> Result<bool> {
        self.ensure_session(ctx, "login")?;

        if let Some(manager) = &self.session_manager {
            manager.regenerate_id(ctx.session())?;
        }

        let Some(user) = self.user_dao.user_by_credentials(login, password)? else {
            debug!(login, "Identification failed");
            return Ok(false);
        };

        if self.is_logged(ctx)? {
            self.logoff(ctx)?;
        }

        debug!(login = %user.login, "User logs in");
        self.establish(ctx, &user)?;
        Ok(true)
    }

    /// Log a user in by login alone
    ///
    /// Meant for administrators impersonating a user and for providers
    /// that already proved the identity. When called while the current
    /// identity is being resolved, the previous identity is not logged off.
    pub fn login_without_password(&self, ctx: &RequestContext, login: &str) -> Result<()> {
        self.ensure_session(ctx, "login")?;

        let user = self
            .user_dao
            .user_by_login(login)?
            .ok_or_else(|| UserServiceError::UnknownUser(login.to_string()))?;

        if !ctx.is_resolving() && self.is_logged(ctx)? {
            self.logoff(ctx)?;
        }

        debug!(login = %user.login, "User logs in without providing a password");
        self.establish(ctx, &user)
    }

    /// Log a user in with a one-time token
    ///
    /// Returns `Ok(false)` if the store does not know the token. The store
    /// is responsible for discarding the token once used.
    pub fn login_via_token(&self, ctx: &RequestContext, token: &str) -> Result<bool> {
        // Checked before the store consumes the token
        self.ensure_session(ctx, "login")?;

        match self.user_dao.user_by_token(token)? {
            Some(user) => {
                self.login_without_password(ctx, &user.login)?;
                Ok(true)
            }
            None => {
                debug!("Unknown login token");
                Ok(false)
            }
        }
    }

    /// Log the current user off
    ///
    /// Listeners are notified while the session still holds the identity.
    pub fn logoff(&self, ctx: &RequestContext) -> Result<()> {
        self.ensure_session(ctx, "logoff")?;

        let login_key = self.session_key(USER_LOGIN_KEY);
        let Some(login) = ctx.session().get(&login_key) else {
            return Ok(());
        };

        self.listeners.before_log_out(self, ctx)?;

        debug!(login = %login, "User logs out");
        ctx.session().remove(&self.session_key(USER_ID_KEY));
        ctx.session().remove(&login_key);
        Ok(())
    }

    // =========== Queries ===========

    /// Check whether a user is logged in
    pub fn is_logged(&self, ctx: &RequestContext) -> Result<bool> {
        let _resolving = ctx.enter_resolution();
        self.ensure_session(ctx, "check if the user is logged")?;

        if ctx.session().contains(&self.session_key(USER_ID_KEY)) {
            return Ok(true);
        }
        self.providers.is_logged(self, ctx)
    }

    /// Id of the current user
    pub fn user_id(&self, ctx: &RequestContext) -> Result<Option<String>> {
        self.ensure_session(ctx, "read the current user")?;

        if let Some(id) = ctx.session().get(&self.session_key(USER_ID_KEY)) {
            return Ok(Some(id));
        }
        let _resolving = ctx.enter_resolution();
        self.providers.user_id(self, ctx)
    }

    /// Login of the current user
    pub fn user_login(&self, ctx: &RequestContext) -> Result<Option<String>> {
        self.ensure_session(ctx, "read the current user")?;

        if let Some(login) = ctx.session().get(&self.session_key(USER_LOGIN_KEY)) {
            return Ok(Some(login));
        }
        let _resolving = ctx.enter_resolution();
        self.providers.user_login(self, ctx)
    }

    /// The current user, loaded from the store
    pub fn logged_user(&self, ctx: &RequestContext) -> Result<Option<User>> {
        self.ensure_session(ctx, "read the current user")?;

        if let Some(id) = ctx.session().get(&self.session_key(USER_ID_KEY)) {
            return self.user_dao.user_by_id(&id);
        }
        let _resolving = ctx.enter_resolution();
        self.providers.logged_user(self, ctx)
    }

    /// Id of the current user, failing when nobody is logged in
    pub fn require_user_id(&self, ctx: &RequestContext) -> Result<String> {
        self.user_id(ctx)?.ok_or(UserServiceError::NoUserLogged)
    }

    // =========== Internals ===========

    fn ensure_session(&self, ctx: &RequestContext, operation: &'static str) -> Result<()> {
        if ctx.session().is_started() {
            return Ok(());
        }
        match &self.session_manager {
            Some(manager) => manager.start(ctx.session()),
            None => Err(UserServiceError::SessionNotInitialized { operation }),
        }
    }

    fn establish(&self, ctx: &RequestContext, user: &User) -> Result<()> {
        ctx.session()
            .insert(self.session_key(USER_ID_KEY), user.id.clone());
        ctx.session()
            .insert(self.session_key(USER_LOGIN_KEY), user.login.clone());
        self.listeners.after_log_in(self, ctx)
    }
}
