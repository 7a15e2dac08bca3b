//! Error types used throughout the sign-in flow

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DeskAuth
///
/// Every failure an interactive or silent sign-in can end in. Cache
/// corruption is deliberately absent: a record that fails to decrypt is
/// deleted and treated as a cache miss, so it never reaches callers.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum AuthError {
    #[error("No loopback port available in {base_port}..={last_port}")]
    PortExhaustion { base_port: u16, last_port: u16 },

    #[error("Authorization rejected by provider: {code}{}", describe(.description))]
    Authorization { code: String, description: Option<String> },

    #[error("Redirect state did not match the authorization request")]
    StateMismatch,

    #[error("No redirect received within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Token exchange rejected: {code}{}", describe(.description))]
    TokenExchange { code: String, description: Option<String> },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Browser launch failed: {0}")]
    Browser(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable, low-cardinality label for structured logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PortExhaustion { .. } => "port_exhaustion",
            Self::Authorization { .. } => "authorization",
            Self::StateMismatch => "state_mismatch",
            Self::Timeout { .. } => "timeout",
            Self::TokenExchange { .. } => "token_exchange",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Browser(_) => "browser",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether a fresh attempt may succeed without any configuration change.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PortExhaustion { .. } | Self::Timeout { .. } | Self::Network(_)
        )
    }

    /// `true` for every outcome where the provider or the redirect itself
    /// refused the sign-in (denial, state forgery, rejected code).
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Authorization { .. } | Self::StateMismatch | Self::TokenExchange { .. }
        )
    }
}

fn describe(description: &Option<String>) -> String {
    description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Result type alias for DeskAuth operations
pub type Result<T> = std::result::Result<T, AuthError>;
