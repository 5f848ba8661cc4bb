//! usersvc Authentication
//!
//! This crate provides:
//! - A session-backed user service (login, logoff, current user)
//! - Pluggable authentication providers consulted when the session holds
//!   no identity, and listeners notified around login and logout
//! - A remember-me provider backed by a cookie token
//! - In-memory user and token stores
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use usersvc_auth::{InMemoryUserStore, RequestContext, Session, SessionId, User, UserService};
//!
//! let store = InMemoryUserStore::new();
//! store.create_user(User::new("1", "alice"), "pw").unwrap();
//! let service = UserService::new(Arc::new(store));
//!
//! let ctx = RequestContext::new(Arc::new(Session::started(SessionId::new("s1"))));
//! assert!(service.login(&ctx, "alice", "pw").unwrap());
//! assert_eq!(service.user_id(&ctx).unwrap().as_deref(), Some("1"));
//!
//! service.logoff(&ctx).unwrap();
//! assert_eq!(service.user_id(&ctx).unwrap(), None);
//! ```

pub mod chain;
pub mod condition;
pub mod context;
pub mod error;
pub mod listener;
pub mod provider;
pub mod providers;
pub mod service;
pub mod session;
pub mod store;
pub mod user;

pub use chain::{AuthListenerChain, AuthProviderChain};
pub use condition::{Condition, IsLoggedCondition, RequestParamCondition, StaticCondition};
pub use context::{CookieJar, RequestContext};
pub use cookie::Cookie;
pub use error::{Result, UserServiceError};
pub use listener::AuthListener;
pub use provider::AuthProvider;
pub use providers::{
    InMemoryRememberMeStore, RememberMeAuthProvider, RememberMeEntry, RememberMeStore,
};
pub use service::{USER_ID_KEY, USER_LOGIN_KEY, UserService};
pub use session::{DefaultSessionManager, Session, SessionId, SessionManager, SessionSnapshot};
pub use store::{InMemoryUserStore, UserDao};
pub use user::{User, generate_token};
