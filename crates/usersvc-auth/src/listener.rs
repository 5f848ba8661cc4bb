//! Authentication listener trait

use crate::context::RequestContext;
use crate::error::Result;
use crate::service::UserService;

/// Hook notified around login and logout
///
/// Listeners run in registration order. An error aborts the notification
/// and is returned to the caller of the login or logout operation.
pub trait AuthListener: Send + Sync {
    /// Listener name for logging
    fn name(&self) -> &str;

    /// Called once the session holds the new identity
    fn after_log_in(&self, service: &UserService, ctx: &RequestContext) -> Result<()>;

    /// Called while the session still holds the identity being logged off
    fn before_log_out(&self, service: &UserService, ctx: &RequestContext) -> Result<()>;
}
