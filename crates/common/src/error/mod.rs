//! Low-level errors shared by the DeskAuth crates
//!
//! [`CommonError`] covers the failures below the sign-in orchestration:
//! reading and writing the token cache, sealing and opening it, and
//! (de)serializing records. The infra layer maps it into
//! `deskauth_domain::AuthError`, which is the only error the public sign-in
//! API returns.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `Persistence` | Cache and salt file I/O |
//! | `Crypto` | Key derivation, AES-GCM seal/open, envelope decoding |
//! | `Serialization` | JSON encoding of records and envelopes |
//! | `Internal` | Invariant violations |
//!
//! [`ErrorClassification`] lets callers choose a log level without matching
//! on variants.
//!
//! ```rust,ignore
//! use crate::error::{CommonError, CommonResult};
//!
//! fn read_record(path: &Path) -> CommonResult<Vec<u8>> {
//!     std::fs::read(path).map_err(|e| CommonError::persistence_op("read", e.to_string()))
//! }
//! ```

use std::fmt;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failure below the sign-in orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Record or envelope could not be encoded or decoded
    Serialization { message: String, format: Option<String> },

    /// File I/O on the cache directory failed
    Persistence { message: String, operation: Option<String> },

    /// Key derivation or authenticated encryption failed
    Crypto { message: String, operation: Option<String> },

    /// Invariant violation
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { message, format: Some(format) } => {
                write!(f, "Serialization error ({format}): {message}")
            }
            Self::Serialization { message, format: None } => {
                write!(f, "Serialization error: {message}")
            }
            Self::Persistence { message, operation: Some(op) } => {
                write!(f, "Persistence error during '{op}': {message}")
            }
            Self::Persistence { message, operation: None } => {
                write!(f, "Persistence error: {message}")
            }
            Self::Crypto { message, operation: Some(op) } => {
                write!(f, "Crypto error during '{op}': {message}")
            }
            Self::Crypto { message, operation: None } => write!(f, "Crypto error: {message}"),
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        // A locked or busy cache file may succeed on the next attempt.
        matches!(self, Self::Persistence { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            // An unreadable cache is recovered by signing in again.
            Self::Crypto { .. } => ErrorSeverity::Warning,
            Self::Serialization { .. } | Self::Persistence { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

impl CommonError {
    /// Serialization error without a format tag
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization { message: message.into(), format: None }
    }

    /// Serialization error for a named format (`JSON`, ...)
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Persistence error without an operation tag
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into(), operation: None }
    }

    /// Persistence error tagged with the failing operation (`save`,
    /// `read_salt`, ...)
    pub fn persistence_op<S: Into<String>, O: Into<String>>(operation: O, message: S) -> Self {
        Self::Persistence { message: message.into(), operation: Some(operation.into()) }
    }

    /// Crypto error tagged with the failing operation (`derive_key`,
    /// `decrypt`, ...)
    pub fn crypto_op<S: Into<String>, O: Into<String>>(operation: O, message: S) -> Self {
        Self::Crypto { message: message.into(), operation: Some(operation.into()) }
    }

    /// Invariant violation
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable, low-cardinality name for structured logs
    pub const fn error_type_name(&self) -> &'static str {
        match self {
            Self::Serialization { .. } => "serialization",
            Self::Persistence { .. } => "persistence",
            Self::Crypto { .. } => "crypto",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Classification shared by the low-level error types
pub trait ErrorClassification {
    /// Whether repeating the operation may succeed
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Errors that indicate a bug rather than an environmental failure
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Error severity levels, mapped onto log levels by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}
