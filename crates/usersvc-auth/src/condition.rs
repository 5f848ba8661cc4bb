//! Request conditions
//!
//! A condition answers a yes/no question about the current request. The
//! remember-me provider uses one to decide whether a login should issue a
//! token.

use crate::context::RequestContext;
use crate::error::Result;
use crate::service::UserService;

/// A yes/no question about the current request
pub trait Condition: Send + Sync {
    fn is_ok(&self, service: &UserService, ctx: &RequestContext) -> Result<bool>;
}

/// True when a user is logged in
#[derive(Debug, Default, Clone, Copy)]
pub struct IsLoggedCondition;

impl Condition for IsLoggedCondition {
    fn is_ok(&self, service: &UserService, ctx: &RequestContext) -> Result<bool> {
        service.is_logged(ctx)
    }
}

/// True when a request parameter carries the expected value
#[derive(Debug, Clone)]
pub struct RequestParamCondition {
    name: String,
    value: String,
}

impl RequestParamCondition {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Condition for RequestParamCondition {
    fn is_ok(&self, _service: &UserService, ctx: &RequestContext) -> Result<bool> {
        Ok(ctx.param(&self.name) == Some(self.value.as_str()))
    }
}

/// A fixed answer
#[derive(Debug, Clone, Copy)]
pub struct StaticCondition(pub bool);

impl Condition for StaticCondition {
    fn is_ok(&self, _service: &UserService, _ctx: &RequestContext) -> Result<bool> {
        Ok(self.0)
    }
}
