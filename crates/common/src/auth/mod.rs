//! OAuth 2.0 authorization code + PKCE for desktop sign-in
//!
//! Protocol pieces for a public desktop client signing in against an
//! Azure AD B2C user flow. The crate holds no I/O besides the token
//! endpoint: listening for the redirect and persisting tokens live behind
//! the traits in [`traits`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Authenticator  │  Orchestrator (deskauth-infra)
//! └────────┬────────┘
//!          │
//!          ├──► OAuthClientTrait   (PkceOAuthClient: URL build, exchange, refresh)
//!          ├──► TokenStoreTrait    (encrypted file cache)
//!          ├──► UrlOpener          (system browser)
//!          │
//!          └──► PKCE utilities     (verifier, challenge, state)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use deskauth_common::auth::{OAuthConfig, PkceOAuthClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin";
//!     let config = OAuthConfig::new(
//!         "client-id",
//!         format!("{authority}/oauth2/v2.0/authorize"),
//!         format!("{authority}/oauth2/v2.0/token"),
//!         Duration::from_secs(30),
//!     );
//!     let client = PkceOAuthClient::new(config)?;
//!
//!     let scopes = vec!["openid".to_string(), "offline_access".to_string()];
//!     let request = client.build_authorization_url(&scopes, "http://localhost:8000")?;
//!     println!("Open this URL in your browser: {}", request.url);
//!
//!     // ... browser redirects back with ?code=...&state=...
//!
//!     let tokens = client
//!         .exchange_code("code", &request.code_verifier, "http://localhost:8000", &scopes)
//!         .await?;
//!     println!("Signed in, token expires in {}s", tokens.seconds_until_expiry());
//!     Ok(())
//! }
//! ```
//!
//! # Security Features
//!
//! - **PKCE**: `S256` challenge, the verifier never leaves the process until
//!   the exchange
//! - **State Validation**: 256-bit random state compared in constant time
//! - **No Client Secrets**: public client only

pub mod client;
pub mod pkce;
pub mod traits;
pub mod types;

pub use client::{AuthorizationRequest, OAuthClientError, PkceOAuthClient};
pub use pkce::PkceChallenge;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, validate_state};
pub use traits::{OAuthClientTrait, SilentAcquisition, TokenStoreTrait, UrlOpener};
pub use types::{
    AccountIdentity, AuthorizationResponse, OAuthConfig, ProviderError, TokenResponse, TokenSet,
    RESERVED_SCOPES,
};
