//! Platform-specific implementations
//!
//! - **[`machine`]**: stable per-machine identity used as key material for
//!   the token cache
//! - **[`browser`]**: the system browser as a [`UrlOpener`]
//!
//! # Platform Support
//!
//! - **Windows**: `COMPUTERNAME`
//! - **Linux**: `/etc/machine-id`, then `/var/lib/dbus/machine-id`
//! - **Everything else**: host name
//!
//! [`UrlOpener`]: deskauth_common::auth::UrlOpener

pub mod browser;
pub mod machine;

pub use browser::SystemBrowser;
pub use machine::machine_identity;
