//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory doubles for the protocol client, token store and
//!   URL opener
//! - **[`temp`]**: temporary cache directories
//!
//! ## Usage
//!
//! ```rust
//! use deskauth_common::auth::TokenStoreTrait;
//! use deskauth_common::testing::{sample_tokens, MemoryTokenStore};
//!
//! let store = MemoryTokenStore::with_tokens(sample_tokens(&["openid"], 3600));
//! assert!(store.load().is_some());
//! ```

pub mod mocks;
pub mod temp;

pub use mocks::{
    sample_tokens, ExchangeCall, MemoryTokenStore, MockOAuthClient, RecordingUrlOpener,
};
pub use temp::TempCacheDir;
