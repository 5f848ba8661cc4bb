//! Configuration types for usersvc
//!
//! This module defines configuration structures used by the service and
//! the CLI. Every section has defaults so a partial TOML file is valid.

use crate::error::{Error, Result};
use crate::types::CookieLifetime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for usersvc
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User service configuration
    pub user_service: UserServiceConfig,
    /// Remember-me cookie configuration
    pub remember_me: RememberMeConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Users seeded into the in-memory store
    pub users: Vec<SeedUser>,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.remember_me.enabled {
            if self.remember_me.cookie_name.trim().is_empty() {
                return Err(Error::configuration("remember_me.cookie_name must not be empty"));
            }
            if self.remember_me.token_length == 0 {
                return Err(Error::configuration("remember_me.token_length must be positive"));
            }
            if matches!(self.remember_me.expire, CookieLifetime::Minutes(m) if m <= 0) {
                return Err(Error::configuration("remember_me.expire must be positive"));
            }
        }

        let mut logins: Vec<&str> = self.users.iter().map(|u| u.login.as_str()).collect();
        logins.sort_unstable();
        if let Some(pair) = logins.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::configuration(format!(
                "duplicate user login: {}",
                pair[0]
            )));
        }

        Ok(())
    }
}

/// User service configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserServiceConfig {
    /// Prefix for the session keys, so several applications sharing one
    /// session do not see each other's identity
    pub session_prefix: String,
    /// Start a session on demand instead of failing when none is active
    pub auto_start_session: bool,
}

/// Remember-me cookie configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberMeConfig {
    /// Register the remember-me provider and listener
    pub enabled: bool,
    /// Name of the cookie carrying the token
    pub cookie_name: String,
    /// Path the cookie is valid for
    pub path: String,
    /// Only send the cookie over HTTPS
    pub secure: bool,
    /// Cookie lifetime (minutes or relative text such as "1 month")
    pub expire: CookieLifetime,
    /// Request parameter that activates remember-me on login
    pub activate_param: String,
    /// Value the activation parameter must carry
    pub activate_value: String,
    /// Length of generated tokens
    pub token_length: usize,
}

impl Default for RememberMeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie_name: "remember_me".to_string(),
            path: "/".to_string(),
            secure: false,
            expire: CookieLifetime::ONE_MONTH,
            activate_param: "remember".to_string(),
            activate_value: "1".to_string(),
            token_length: 32,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A user account declared in the configuration file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}
