//! Sign-in configuration
//!
//! [`AuthConfig`] is deserialized from JSON/TOML files or assembled from
//! environment variables by the infra loader. Every field except the
//! identity of the registered application has a default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTHORIZE_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INTERACTION_TIMEOUT_SECS,
    DEFAULT_PORT_ATTEMPTS, DEFAULT_REDIRECT_BASE_PORT, DEFAULT_REFRESH_THRESHOLD_SECS,
    DEFAULT_SCOPES, DEFAULT_SHUTDOWN_TIMEOUT_SECS, MAX_REFRESH_THRESHOLD_SECS, TOKEN_PATH,
};
use crate::errors::{AuthError, Result};

/// Configuration for one registered desktop application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Application (client) id registered with the tenant
    pub client_id: String,

    /// B2C tenant short name (`contoso` for `contoso.onmicrosoft.com`)
    pub tenant: String,

    /// User flow / custom policy name, e.g. `B2C_1_signupsignin`
    pub policy: String,

    /// Full authority URL; overrides `tenant` + `policy` when set
    pub authority: Option<String>,

    /// Names the cache directory and feeds key derivation
    pub app_name: String,

    /// First port tried for the loopback listener
    pub redirect_base_port: u16,
    /// Consecutive ports tried, starting at `redirect_base_port`
    pub port_attempts: u16,
    /// Seconds the user has to finish the browser sign-in
    pub interaction_timeout_secs: u64,
    /// Seconds allowed for the listener's graceful stop
    pub shutdown_timeout_secs: u64,
    /// Seconds per token endpoint request
    pub http_timeout_secs: u64,

    /// Seconds before expiry at which a cached token is treated as stale
    pub refresh_threshold_secs: i64,

    /// Scopes merged into every request
    pub default_scopes: Vec<String>,

    /// Overrides the per-OS cache directory
    pub cache_dir: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tenant: String::new(),
            policy: String::new(),
            authority: None,
            app_name: String::new(),
            redirect_base_port: DEFAULT_REDIRECT_BASE_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            interaction_timeout_secs: DEFAULT_INTERACTION_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            default_scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            cache_dir: None,
        }
    }
}

impl AuthConfig {
    /// Create a configuration for a B2C tenant and policy with default
    /// timeouts and ports.
    #[must_use]
    pub fn b2c(
        client_id: impl Into<String>,
        tenant: impl Into<String>,
        policy: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant: tenant.into(),
            policy: policy.into(),
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Authority URL without a trailing slash.
    ///
    /// # Errors
    /// Returns `AuthError::Config` when neither an explicit authority nor
    /// a tenant/policy pair is configured.
    pub fn authority(&self) -> Result<String> {
        if let Some(authority) = self.authority.as_deref().filter(|a| !a.trim().is_empty()) {
            return Ok(authority.trim_end_matches('/').to_string());
        }

        if self.tenant.is_empty() || self.policy.is_empty() {
            return Err(AuthError::Config(
                "either `authority` or both `tenant` and `policy` must be set".to_string(),
            ));
        }

        Ok(format!(
            "https://{tenant}.b2clogin.com/{tenant}.onmicrosoft.com/{policy}",
            tenant = self.tenant,
            policy = self.policy
        ))
    }

    /// `{authority}/oauth2/v2.0/authorize`
    ///
    /// # Errors
    /// See [`AuthConfig::authority`].
    pub fn authorize_endpoint(&self) -> Result<String> {
        Ok(format!("{}/{AUTHORIZE_PATH}", self.authority()?))
    }

    /// `{authority}/oauth2/v2.0/token`
    ///
    /// # Errors
    /// See [`AuthConfig::authority`].
    pub fn token_endpoint(&self) -> Result<String> {
        Ok(format!("{}/{TOKEN_PATH}", self.authority()?))
    }

    /// Check that the configuration can drive a sign-in.
    ///
    /// # Errors
    /// Returns `AuthError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("`client_id` must not be empty".to_string()));
        }
        if self.app_name.trim().is_empty() {
            return Err(AuthError::Config("`app_name` must not be empty".to_string()));
        }
        if self.port_attempts == 0 {
            return Err(AuthError::Config("`port_attempts` must be at least 1".to_string()));
        }
        if self.redirect_base_port == 0 {
            return Err(AuthError::Config("`redirect_base_port` must not be 0".to_string()));
        }
        if self.redirect_base_port.checked_add(self.port_attempts - 1).is_none() {
            return Err(AuthError::Config(format!(
                "port range starting at {} with {} attempts exceeds 65535",
                self.redirect_base_port, self.port_attempts
            )));
        }
        if self.interaction_timeout_secs == 0 {
            return Err(AuthError::Config(
                "`interaction_timeout_secs` must be positive".to_string(),
            ));
        }
        if !(0..=MAX_REFRESH_THRESHOLD_SECS).contains(&self.refresh_threshold_secs) {
            return Err(AuthError::Config(format!(
                "`refresh_threshold_secs` must be between 0 and {MAX_REFRESH_THRESHOLD_SECS}"
            )));
        }
        self.authority().map(|_| ())
    }

    /// [`AuthConfig::interaction_timeout_secs`] as a `Duration`.
    #[must_use]
    pub const fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }

    /// [`AuthConfig::shutdown_timeout_secs`] as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// [`AuthConfig::http_timeout_secs`] as a `Duration`.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Merge caller scopes with `default_scopes`, keeping first-seen order
    /// and dropping duplicates and blanks.
    #[must_use]
    pub fn merged_scopes(&self, requested: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(requested.len() + self.default_scopes.len());
        for scope in requested.iter().chain(self.default_scopes.iter()) {
            let scope = scope.trim();
            if !scope.is_empty() && !merged.iter().any(|existing| existing == scope) {
                merged.push(scope.to_string());
            }
        }
        merged
    }
}
