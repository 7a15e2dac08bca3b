//! Token persistence
//!
//! Encrypted, machine-bound file cache for the signed-in user's tokens.

pub mod token_store;

pub use token_store::{resolve_cache_dir, SecureTokenStore};
