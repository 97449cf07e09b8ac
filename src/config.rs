//! Engine configuration.
//!
//! [`Config`] derives `Deserialize`, so callers can load it from whatever
//! format they already use. Cache bounds are given as spec strings such as
//! `maximumSize=500,expireAfterAccess=10m`.

use std::{fmt, str::FromStr, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::introspect::BASE_VIEW;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Invalid cache spec '{spec}': {reason}")]
    InvalidCacheSpec { spec: String, reason: String },

    #[error("Unknown registration strategy '{0}' (expected 'auto' or 'explicit')")]
    UnknownStrategy(String),

    #[error("Default view name cannot be empty")]
    EmptyDefaultView,
}

/// Bounds for one cache.
///
/// Keys: `maximumSize`, `initialCapacity`, `expireAfterAccess`,
/// `expireAfterWrite`. Durations take a unit suffix (`ms`, `s`, `m`, `h`,
/// `d`); a bare number is seconds. An empty spec means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct CacheSpec {
    pub maximum_size: Option<usize>,
    /// Accepted for compatibility with existing specs; slots are not preallocated
    pub initial_capacity: Option<usize>,
    pub expire_after_access: Option<Duration>,
    pub expire_after_write: Option<Duration>,
}

impl CacheSpec {
    pub fn unbounded() -> Self {
        CacheSpec::default()
    }

    pub fn with_maximum_size(mut self, size: usize) -> Self {
        self.maximum_size = Some(size);
        self
    }

    pub fn with_expire_after_access(mut self, duration: Duration) -> Self {
        self.expire_after_access = Some(duration);
        self
    }

    pub fn with_expire_after_write(mut self, duration: Duration) -> Self {
        self.expire_after_write = Some(duration);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.maximum_size.is_some() || self.expire_after_access.is_some() || self.expire_after_write.is_some()
    }
}

impl FromStr for CacheSpec {
    type Err = ConfigurationError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigurationError::InvalidCacheSpec {
            spec: spec.to_string(),
            reason,
        };

        let mut result = CacheSpec::default();

        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| invalid(format!("expected key=value, got '{}'", pair)))?;

            let duplicate = || invalid(format!("'{}' given more than once", key));

            match key {
                "maximumSize" => {
                    if result.maximum_size.is_some() {
                        return Err(duplicate());
                    }
                    result.maximum_size = Some(parse_count(value).map_err(invalid)?);
                }
                "initialCapacity" => {
                    if result.initial_capacity.is_some() {
                        return Err(duplicate());
                    }
                    result.initial_capacity = Some(parse_count(value).map_err(invalid)?);
                }
                "expireAfterAccess" => {
                    if result.expire_after_access.is_some() {
                        return Err(duplicate());
                    }
                    result.expire_after_access = Some(parse_duration(value).map_err(invalid)?);
                }
                "expireAfterWrite" => {
                    if result.expire_after_write.is_some() {
                        return Err(duplicate());
                    }
                    result.expire_after_write = Some(parse_duration(value).map_err(invalid)?);
                }
                other => return Err(invalid(format!("unknown key '{}'", other))),
            }
        }

        Ok(result)
    }
}

impl TryFrom<String> for CacheSpec {
    type Error = ConfigurationError;

    fn try_from(spec: String) -> Result<Self, Self::Error> {
        spec.parse()
    }
}

impl fmt::Display for CacheSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(n) = self.maximum_size {
            parts.push(format!("maximumSize={}", n));
        }
        if let Some(n) = self.initial_capacity {
            parts.push(format!("initialCapacity={}", n));
        }
        if let Some(d) = self.expire_after_access {
            parts.push(format!("expireAfterAccess={}ms", d.as_millis()));
        }
        if let Some(d) = self.expire_after_write {
            parts.push(format!("expireAfterWrite={}ms", d.as_millis()));
        }
        write!(f, "{}", parts.join(","))
    }
}

fn parse_count(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("'{}' is not a non-negative integer", value))
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);

    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("'{}' is not a duration", value))?;

    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "" | "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        "h" => Duration::from_secs(amount.saturating_mul(60 * 60)),
        "d" => Duration::from_secs(amount.saturating_mul(24 * 60 * 60)),
        other => return Err(format!("unknown duration unit '{}'", other)),
    };

    Ok(duration)
}

fn default_cache_spec() -> CacheSpec {
    CacheSpec::default().with_maximum_size(1000)
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bounds of the compiled-filter cache, keyed by filter text
    pub node_cache: CacheSpec,

    /// Bounds of the per-type view table cache
    pub introspector_cache: CacheSpec,

    /// Non-base views also contain every base-view property
    pub include_base_in_views: bool,

    /// Properties that declare no view belong to the base view
    pub add_unviewed_to_base: bool,

    /// Escalate unresolved functions and unknown record types instead of
    /// skipping them with a warning
    pub strict: bool,

    /// View used by [`Engine::apply`](crate::Engine::apply)
    pub default_view: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node_cache: default_cache_spec(),
            introspector_cache: default_cache_spec(),
            include_base_in_views: true,
            add_unviewed_to_base: true,
            strict: true,
            default_view: BASE_VIEW.to_string(),
        }
    }
}
