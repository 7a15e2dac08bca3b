//! Application constants
//!
//! Centralized location for the protocol and runtime defaults used by the
//! sign-in flow.

// Loopback redirect listener
/// First port tried for the redirect listener
pub const DEFAULT_REDIRECT_BASE_PORT: u16 = 8000;
/// Consecutive ports tried before giving up
pub const DEFAULT_PORT_ATTEMPTS: u16 = 3;
/// Address the listener binds
pub const LOOPBACK_HOST: &str = "127.0.0.1";
/// IPv6 loopback, bound on the same port when available
pub const LOOPBACK_HOST_V6: &str = "::1";
/// Host in the registered redirect URI
pub const REDIRECT_HOST: &str = "localhost";

// Interaction deadlines
/// How long the user has to finish signing in
pub const DEFAULT_INTERACTION_TIMEOUT_SECS: u64 = 300;
/// Bound on the listener's graceful stop
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
/// Per-request timeout for the token endpoint
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Tokens expiring within this window are refreshed
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;
/// Upper bound accepted for the refresh window (one day)
pub const MAX_REFRESH_THRESHOLD_SECS: i64 = 86_400;

// OIDC scopes requested on every sign-in
/// Requests an ID token
pub const SCOPE_OPENID: &str = "openid";
/// Requests profile claims in the ID token
pub const SCOPE_PROFILE: &str = "profile";
/// Requests a refresh token
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";
/// Scopes merged into every request
pub const DEFAULT_SCOPES: [&str; 3] = [SCOPE_OPENID, SCOPE_PROFILE, SCOPE_OFFLINE_ACCESS];

// Azure AD B2C endpoints (relative to the authority)
/// Authorization endpoint
pub const AUTHORIZE_PATH: &str = "oauth2/v2.0/authorize";
/// Token endpoint
pub const TOKEN_PATH: &str = "oauth2/v2.0/token";

// Token cache
/// Encrypted token record
pub const TOKEN_CACHE_FILE: &str = "token_cache.dat";
/// Per-install key derivation salt
pub const TOKEN_CACHE_SALT_FILE: &str = "token_cache.salt";
