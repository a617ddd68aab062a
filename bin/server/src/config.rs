//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use `__` as the separator, e.g. `AUTHORITY__TIMEOUT_SECONDS=10`.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tenant_gate_authz::AuthorityOptions;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Caller identity resolution.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Access-review authority connection.
    #[serde(default)]
    pub authority: AuthorityConfig,
}

/// How the caller identity is read from requests.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Header set by the trusted auth proxy.
    #[serde(default = "default_identity_header")]
    pub header: String,

    /// Prefix stripped from the header value, e.g. `accounts.google.com:`.
    #[serde(default)]
    pub prefix: String,
}

/// Access-review authority settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    /// Kubeconfig used when not running in a cluster.
    /// Defaults to `$KUBECONFIG`, then `~/.kube/config`.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Upper bound on a review round trip, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Upper bound on connecting to the API server, in seconds.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_identity_header() -> String {
    "kubeflow-userid".to_string()
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_connect_timeout_seconds() -> u64 {
    2
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: default_identity_header(),
            prefix: String::new(),
        }
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

impl AuthorityConfig {
    /// Client options derived from this configuration.
    #[must_use]
    pub fn options(&self) -> AuthorityOptions {
        AuthorityOptions {
            timeout: Duration::from_secs(self.timeout_seconds),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_environment(config::Environment::default().source(Some(source)))
            .expect("valid configuration")
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = load(&[]);
        assert_eq!(config.listen_addr, SocketAddr::from(([0, 0, 0, 0], 5000)));
        assert_eq!(config.identity.header, "kubeflow-userid");
        assert_eq!(config.identity.prefix, "");
        assert_eq!(config.authority.kubeconfig, None);
        assert_eq!(
            config.authority.options(),
            AuthorityOptions {
                timeout: Duration::from_secs(5),
                connect_timeout: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn nested_keys_override_defaults() {
        let config = load(&[
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("IDENTITY__HEADER", "x-forwarded-user"),
            ("IDENTITY__PREFIX", "accounts.google.com:"),
            ("AUTHORITY__KUBECONFIG", "/etc/kube/config"),
            ("AUTHORITY__TIMEOUT_SECONDS", "10"),
        ]);
        assert_eq!(config.listen_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.identity.header, "x-forwarded-user");
        assert_eq!(config.identity.prefix, "accounts.google.com:");
        assert_eq!(
            config.authority.kubeconfig,
            Some(PathBuf::from("/etc/kube/config"))
        );
        assert_eq!(config.authority.timeout_seconds, 10);
        assert_eq!(config.authority.connect_timeout_seconds, 2);
    }
}
