//! Per-request context
//!
//! Every user service operation receives a [`RequestContext`]: the client's
//! session, the request cookies, the request parameters and the marker
//! telling whether an identity resolution is in progress. Nothing is read
//! from process-wide state.

use cookie::Cookie;
use parking_lot::RwLock;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::session::Session;

/// Request cookies plus the changes queued for the response
///
/// Reads see changes made during the request, so a provider that sets a
/// cookie reads it back immediately.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: RwLock<cookie::CookieJar>,
}

impl CookieJar {
    /// Create a jar from the request cookies
    pub fn new(cookies: HashMap<String, String>) -> Self {
        let jar = Self::default();
        for (name, value) in cookies {
            jar.add_original(name, value);
        }
        jar
    }

    /// Record a cookie sent by the client
    fn add_original(&self, name: String, value: String) {
        self.inner.write().add_original(Cookie::new(name, value));
    }

    /// Read a cookie value
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().get(name).map(|c| c.value().to_string())
    }

    /// Set a cookie for the rest of the request and the response
    pub fn add(&self, cookie: Cookie<'static>) {
        self.inner.write().add(cookie);
    }

    /// Drop a cookie; the response clears it when the client sent it
    ///
    /// Returns false when the jar did not hold the cookie.
    pub fn remove(&self, name: &str, path: &str) -> bool {
        let mut jar = self.inner.write();
        if jar.get(name).is_none() {
            return false;
        }
        jar.remove(Cookie::build((name.to_string(), "")).path(path.to_string()));
        true
    }

    /// Cookies the response must set, removal cookies included
    pub fn delta(&self) -> Vec<Cookie<'static>> {
        self.inner.read().delta().cloned().collect()
    }

    /// Current cookie values, as the client will hold them after the response
    pub fn values(&self) -> HashMap<String, String> {
        self.inner
            .read()
            .iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect()
    }
}

/// Everything an operation needs to know about the current request
#[derive(Debug)]
pub struct RequestContext {
    session: Arc<Session>,
    cookies: CookieJar,
    params: HashMap<String, String>,
    resolving: Cell<usize>,
}

impl RequestContext {
    /// Create a context around the client's session
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            cookies: CookieJar::default(),
            params: HashMap::new(),
            resolving: Cell::new(0),
        }
    }

    /// Set the request cookies
    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies = CookieJar::new(cookies);
        self
    }

    /// Add a single request cookie
    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.add_original(name.into(), value.into());
        self
    }

    /// Add a request parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The client's session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The request cookie jar
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Read a request parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Check whether the user service is resolving the current identity
    ///
    /// Logins triggered by a provider during resolution must not log the
    /// current identity off first.
    pub fn is_resolving(&self) -> bool {
        self.resolving.get() > 0
    }

    /// Mark an identity resolution as in progress until the guard drops
    pub(crate) fn enter_resolution(&self) -> ResolutionGuard<'_> {
        self.resolving.set(self.resolving.get() + 1);
        ResolutionGuard {
            depth: &self.resolving,
        }
    }
}

/// Releases the resolution marker on drop, including on early returns
pub(crate) struct ResolutionGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
