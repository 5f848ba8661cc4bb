//! Pluggable authentication provider trait
//!
//! Providers complete the primary session identity: when the session holds
//! no user, the service asks each registered provider in turn. A provider
//! that cannot tell who the user is answers "nobody" rather than failing.

use crate::context::RequestContext;
use crate::error::Result;
use crate::service::UserService;
use crate::user::User;

/// Secondary source of the current identity
pub trait AuthProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check whether this provider recognizes the current user
    fn is_logged(&self, service: &UserService, ctx: &RequestContext) -> Result<bool>;

    /// Id of the user this provider recognizes
    fn user_id(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>>;

    /// Login of the user this provider recognizes
    fn user_login(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<String>>;

    /// The user this provider recognizes
    fn logged_user(&self, service: &UserService, ctx: &RequestContext) -> Result<Option<User>>;
}
