//! Serde data structures for the shadowtee configuration file.
//!
//! Contains [`Config`] (the root), [`BackendConfig`], [`MirrorConfig`],
//! and [`Defaults`]. All types derive `Serialize` and `Deserialize`
//! with `deny_unknown_fields` for strict parsing.

use serde::{Deserialize, Serialize};

const fn default_primary_timeout() -> u64 {
    3000
}

const fn default_secondary_timeout() -> u64 {
    1000
}

const fn default_percent() -> f64 {
    100.0
}

fn is_default_primary_timeout(v: &u64) -> bool {
    *v == default_primary_timeout()
}

fn is_default_secondary_timeout(v: &u64) -> bool {
    *v == default_secondary_timeout()
}

#[allow(clippy::float_cmp)]
fn is_default_percent(v: &f64) -> bool {
    *v == default_percent()
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_mirror(v: &MirrorConfig) -> bool {
    is_default_percent(&v.percent) && v.methods.is_none()
}

fn is_default_defaults(v: &Defaults) -> bool {
    v.primary_timeout == default_primary_timeout()
        && v.secondary_timeout == default_secondary_timeout()
        && !v.forward_client_ip
        && !v.close_connections
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub primary: BackendConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondaries: Vec<BackendConfig>,

    #[serde(default, skip_serializing_if = "is_default_mirror")]
    pub mirror: MirrorConfig,

    #[serde(default, skip_serializing_if = "is_default_defaults")]
    pub defaults: Defaults,

    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,
}

impl Config {
    /// Build a config with only a primary backend and all defaults.
    #[must_use]
    pub fn with_primary(url: impl Into<String>) -> Self {
        Self {
            primary: BackendConfig::new(url),
            secondaries: Vec::new(),
            mirror: MirrorConfig::default(),
            defaults: Defaults::default(),
            debug: false,
        }
    }

    #[must_use]
    pub fn total_backends(&self) -> usize {
        1 + self.secondaries.len()
    }

    /// Effective timeout of the primary backend in milliseconds.
    #[must_use]
    pub fn primary_timeout(&self) -> u64 {
        self.primary.timeout.unwrap_or(self.defaults.primary_timeout)
    }

    /// Effective timeout of a secondary backend in milliseconds.
    #[must_use]
    pub fn secondary_timeout(&self, backend: &BackendConfig) -> u64 {
        backend.timeout.unwrap_or(self.defaults.secondary_timeout)
    }
}

/// One upstream as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// `scheme://host:port` or bare `host:port` (scheme defaults to http).
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub rewrite_host: bool,
}

impl BackendConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
            rewrite_host: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Share of requests, 0.0 to 100.0, that secondaries receive.
    #[serde(default = "default_percent", skip_serializing_if = "is_default_percent")]
    pub percent: f64,

    /// Method pattern such as `GET|POST`; unset mirrors every method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            percent: default_percent(),
            methods: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(
        default = "default_primary_timeout",
        skip_serializing_if = "is_default_primary_timeout"
    )]
    pub primary_timeout: u64,

    #[serde(
        default = "default_secondary_timeout",
        skip_serializing_if = "is_default_secondary_timeout"
    )]
    pub secondary_timeout: u64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub forward_client_ip: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub close_connections: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            primary_timeout: default_primary_timeout(),
            secondary_timeout: default_secondary_timeout(),
            forward_client_ip: false,
            close_connections: false,
        }
    }
}
