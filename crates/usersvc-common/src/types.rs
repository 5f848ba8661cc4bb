//! Core type definitions for usersvc
//!
//! This module defines the cookie lifetime type used by the remember-me
//! provider. A lifetime is either a plain number of minutes or a relative
//! duration such as `"1 month"`.

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Calendar unit of a relative lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifetimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl LifetimeUnit {
    /// Parse a unit name, accepting singular, plural and short forms
    fn parse(s: &str) -> Option<Self> {
        let unit = match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Second,
            "min" | "mins" | "minute" | "minutes" => Self::Minute,
            "h" | "hour" | "hours" => Self::Hour,
            "d" | "day" | "days" => Self::Day,
            "w" | "week" | "weeks" => Self::Week,
            "month" | "months" => Self::Month,
            "y" | "year" | "years" => Self::Year,
            _ => return None,
        };
        Some(unit)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// How long a remember-me cookie stays valid
///
/// Deserializes from either an integer (minutes) or a string. Numeric
/// strings are minutes too; anything else must be `<amount> <unit>` with an
/// optional leading `+`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLifetime", into = "RawLifetime")]
pub enum CookieLifetime {
    /// A number of minutes
    Minutes(i64),
    /// A calendar-relative duration
    Relative { amount: u32, unit: LifetimeUnit },
}

impl CookieLifetime {
    /// Default remember-me lifetime of one month
    pub const ONE_MONTH: Self = Self::Relative {
        amount: 1,
        unit: LifetimeUnit::Month,
    };

    /// A lifetime in minutes; `None` unless positive
    pub const fn minutes(minutes: i64) -> Option<Self> {
        if minutes > 0 {
            Some(Self::Minutes(minutes))
        } else {
            None
        }
    }

    /// Compute the expiry instant relative to `now`
    ///
    /// Saturates at the maximum representable instant on overflow.
    #[must_use]
    pub fn expires_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let expiry = match *self {
            Self::Minutes(minutes) => {
                TimeDelta::try_minutes(minutes).and_then(|d| now.checked_add_signed(d))
            }
            Self::Relative { amount, unit } => {
                let amount = i64::from(amount);
                let delta = match unit {
                    LifetimeUnit::Second => TimeDelta::try_seconds(amount),
                    LifetimeUnit::Minute => TimeDelta::try_minutes(amount),
                    LifetimeUnit::Hour => TimeDelta::try_hours(amount),
                    LifetimeUnit::Day => TimeDelta::try_days(amount),
                    LifetimeUnit::Week => TimeDelta::try_weeks(amount),
                    LifetimeUnit::Month | LifetimeUnit::Year => None,
                };
                match unit {
                    LifetimeUnit::Month => u32::try_from(amount)
                        .ok()
                        .and_then(|m| now.checked_add_months(Months::new(m))),
                    LifetimeUnit::Year => u32::try_from(amount)
                        .ok()
                        .and_then(|y| y.checked_mul(12))
                        .and_then(|m| now.checked_add_months(Months::new(m))),
                    _ => delta.and_then(|d| now.checked_add_signed(d)),
                }
            }
        };
        expiry.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for CookieLifetime {
    fn default() -> Self {
        Self::ONE_MONTH
    }
}

impl FromStr for CookieLifetime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed).trim();

        if body.is_empty() {
            return Err(Error::invalid_lifetime(s));
        }

        if let Ok(minutes) = body.parse::<i64>() {
            return Self::minutes(minutes).ok_or_else(|| Error::invalid_lifetime(s));
        }

        let mut parts = body.split_whitespace();
        let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::invalid_lifetime(s));
        };

        let amount = amount
            .parse::<u32>()
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| Error::invalid_lifetime(s))?;
        let unit = LifetimeUnit::parse(unit).ok_or_else(|| Error::invalid_lifetime(s))?;

        Ok(Self::Relative { amount, unit })
    }
}

impl fmt::Display for CookieLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(f, "{minutes}"),
            Self::Relative { amount: 1, unit } => write!(f, "1 {}", unit.name()),
            Self::Relative { amount, unit } => write!(f, "{amount} {}s", unit.name()),
        }
    }
}

/// Wire form of a lifetime: integer minutes or text
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLifetime {
    Minutes(i64),
    Text(String),
}

impl TryFrom<RawLifetime> for CookieLifetime {
    type Error = Error;

    fn try_from(raw: RawLifetime) -> Result<Self, Self::Error> {
        match raw {
            RawLifetime::Minutes(minutes) => Self::minutes(minutes)
                .ok_or_else(|| Error::invalid_lifetime(minutes.to_string())),
            RawLifetime::Text(text) => text.parse(),
        }
    }
}

impl From<CookieLifetime> for RawLifetime {
    fn from(lifetime: CookieLifetime) -> Self {
        match lifetime {
            CookieLifetime::Minutes(minutes) => Self::Minutes(minutes),
            relative @ CookieLifetime::Relative { .. } => Self::Text(relative.to_string()),
        }
    }
}
