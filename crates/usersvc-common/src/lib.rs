//! usersvc Common - Shared configuration and types
//!
//! This crate provides the configuration model, the cookie lifetime type
//! and the error definitions shared by the usersvc crates and binaries.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, LoggingConfig, RememberMeConfig, SeedUser, UserServiceConfig};
pub use error::{Error, Result};
pub use types::CookieLifetime;
