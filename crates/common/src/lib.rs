//! Shared building blocks for DeskAuth crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error types and classification
//! - `runtime`: key derivation and authenticated encryption
//! - `platform`: OAuth 2.0 + PKCE protocol client
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: in-memory doubles and temp directories

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod crypto;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "platform")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::{OAuthClientTrait, PkceOAuthClient, TokenSet, TokenStoreTrait, UrlOpener};
#[cfg(feature = "runtime")]
pub use crypto::{EncryptedData, EncryptionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
