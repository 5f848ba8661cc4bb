//! Provider and listener chains
//!
//! This module provides the ordered collections the user service consults:
//! providers are asked in registration order and the first one that knows
//! the user wins; listeners are all notified in registration order.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::Result;
use crate::listener::AuthListener;
use crate::provider::AuthProvider;
use crate::service::UserService;
use crate::user::User;

/// Chain of authentication providers (first match wins)
#[derive(Clone, Default)]
pub struct AuthProviderChain {
    providers: Vec<Arc<dyn AuthProvider>>,
}

impl AuthProviderChain {
    /// Create a new empty provider chain
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider to the chain
    pub fn add<P: AuthProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a provider wrapped in Arc
    pub fn add_arc(&mut self, provider: Arc<dyn AuthProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Replace every provider
    pub fn replace(&mut self, providers: Vec<Arc<dyn AuthProvider>>) {
        self.providers = providers;
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Get the number of providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Names of the providers, in order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// True as soon as one provider recognizes the user
    pub fn is_logged(&self, service: &UserService, ctx: &RequestContext) -> Result<bool> {
        for provider in &self.providers {
            if provider.is_logged(service, ctx)? {
                tracing::debug!("User recognized by provider: {}", provider.name());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// First non-empty user id reported by a provider
    pub fn user_id(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>> {
        self.first_match(|p| Ok(p.user_id(service, ctx)?.filter(|id| !id.is_empty())))
    }

    /// First non-empty login reported by a provider
    pub fn user_login(
        &self,
        service: &UserService,
        ctx: &RequestContext,
    ) -> Result<Option<String>> {
        self.first_match(|p| Ok(p.user_login(service, ctx)?.filter(|login| !login.is_empty())))
    }

    /// First user reported by a provider
    pub fn logged_user(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<User>> {
        self.first_match(|p| p.logged_user(service, ctx))
    }

    fn first_match<T>(
        &self,
        mut ask: impl FnMut(&dyn AuthProvider) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        for provider in &self.providers {
            if let Some(found) = ask(provider.as_ref())? {
                tracing::debug!("Identity resolved by provider: {}", provider.name());
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl AuthProvider for AuthProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_logged(&self, service: &UserService, ctx: &RequestContext) -> Result<bool> {
        AuthProviderChain::is_logged(self, service, ctx)
    }

    fn user_id(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>> {
        AuthProviderChain::user_id(self, service, ctx)
    }

    fn user_login(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>> {
        AuthProviderChain::user_login(self, service, ctx)
    }

    fn logged_user(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<User>> {
        AuthProviderChain::logged_user(self, service, ctx)
    }
}

/// Chain of authentication listeners (all notified, in order)
#[derive(Clone, Default)]
pub struct AuthListenerChain {
    listeners: Vec<Arc<dyn AuthListener>>,
}

impl AuthListenerChain {
    /// Create a new empty listener chain
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Add a listener to the chain
    pub fn add<L: AuthListener + 'static>(&mut self, listener: L) -> &mut Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Add a listener wrapped in Arc
    pub fn add_arc(&mut self, listener: Arc<dyn AuthListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    /// Replace every listener
    pub fn replace(&mut self, listeners: Vec<Arc<dyn AuthListener>>) {
        self.listeners = listeners;
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Get the number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Notify every listener that a user logged in
    pub fn after_log_in(&self, service: &UserService, ctx: &RequestContext) -> Result<()> {
        for listener in &self.listeners {
            tracing::trace!("Notifying {} after login", listener.name());
            listener.after_log_in(service, ctx)?;
        }
        Ok(())
    }

    /// Notify every listener that a user is about to log out
    pub fn before_log_out(&self, service: &UserService, ctx: &RequestContext) -> Result<()> {
        for listener in &self.listeners {
            tracing::trace!("Notifying {} before logout", listener.name());
            listener.before_log_out(service, ctx)?;
        }
        Ok(())
    }
}
