//! # DeskAuth Infrastructure
//!
//! Everything in the sign-in flow that touches the outside world.
//!
//! This crate contains:
//! - The sign-in orchestrator ([`Authenticator`])
//! - The loopback redirect listener (axum on `127.0.0.1`)
//! - The encrypted, machine-bound token cache
//! - Configuration loading from environment and files
//! - Platform lookups (machine identity, system browser)
//!
//! ## Architecture
//! - Implements the seams defined in `deskauth_common::auth`
//! - Depends on `deskauth-domain` for configuration and errors
//! - Never installs a tracing subscriber; that is the binary's job

pub mod authenticator;
pub mod config;
pub mod loopback;
pub mod platform;
pub mod storage;

// Re-export commonly used items
pub use authenticator::Authenticator;
pub use loopback::{CaptureStatus, LoopbackCaptureServer};
pub use platform::{machine_identity, SystemBrowser};
pub use storage::{resolve_cache_dir, SecureTokenStore};
