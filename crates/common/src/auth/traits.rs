//! Seams between the sign-in orchestrator and its collaborators
//!
//! These traits let the orchestrator run against the real identity
//! provider, the encrypted file cache and the system browser in
//! production, and against in-memory doubles in tests.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::{AuthorizationRequest, OAuthClientError};
use super::types::TokenSet;
use crate::error::CommonResult;

/// Outcome of a silent acquisition that produced a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilentAcquisition {
    /// The cached token is still valid for the requested scopes
    Cached(TokenSet),
    /// The cached token was stale and has been renewed with its refresh
    /// token
    Refreshed(TokenSet),
}

impl SilentAcquisition {
    /// Tokens regardless of how they were obtained.
    #[must_use]
    pub fn into_tokens(self) -> TokenSet {
        match self {
            Self::Cached(tokens) | Self::Refreshed(tokens) => tokens,
        }
    }

    /// Borrowed view of the tokens.
    #[must_use]
    pub const fn tokens(&self) -> &TokenSet {
        match self {
            Self::Cached(tokens) | Self::Refreshed(tokens) => tokens,
        }
    }
}

/// Protocol client for the authorization-code + PKCE flow
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Build the URL the browser is sent to, together with the secrets the
    /// caller must keep for the exchange.
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` for an unusable endpoint.
    fn build_authorization_url(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, OAuthClientError>;

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// Provider rejections surface as `OAuthClientError::Provider`.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError>;

    /// Redeem a refresh token.
    ///
    /// # Errors
    /// Provider rejections surface as `OAuthClientError::Provider`.
    async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError>;

    /// Acquire a token without user interaction.
    ///
    /// Returns the cached token when it is valid beyond
    /// `threshold_seconds` and covers `scopes`; otherwise redeems its
    /// refresh token. Never opens a browser, and every failure is a miss.
    async fn silent(
        &self,
        scopes: &[String],
        cached: Option<&TokenSet>,
        threshold_seconds: i64,
    ) -> Option<SilentAcquisition> {
        let cached = cached?;

        if !cached.covers_scopes(scopes) {
            debug!(granted = %cached.scope_string(), "cached token does not cover requested scopes");
            return None;
        }

        if !cached.is_expired(threshold_seconds) {
            debug!(expires_in = cached.seconds_until_expiry(), "using cached token");
            return Some(SilentAcquisition::Cached(cached.clone()));
        }

        let Some(refresh_token) = cached.refresh_token.as_deref() else {
            debug!("cached token is stale and has no refresh token");
            return None;
        };

        match self.refresh(refresh_token, scopes).await {
            Ok(mut fresh) => {
                if fresh.account.is_none() {
                    fresh.account.clone_from(&cached.account);
                }
                debug!(expires_in = fresh.seconds_until_expiry(), "silent refresh succeeded");
                Some(SilentAcquisition::Refreshed(fresh))
            }
            Err(err) => {
                warn!(error = %err, "silent refresh failed");
                None
            }
        }
    }
}

/// Persistent store for the single cached token record
pub trait TokenStoreTrait: Send + Sync {
    /// Replace the stored record.
    ///
    /// # Errors
    /// Returns `CommonError::Persistence` or `CommonError::Crypto` if the
    /// record cannot be written.
    fn save(&self, tokens: &TokenSet) -> CommonResult<()>;

    /// Read the stored record. Unreadable records count as absent.
    fn load(&self) -> Option<TokenSet>;

    /// Remove the stored record. A missing record is not an error.
    ///
    /// # Errors
    /// Returns `CommonError::Persistence` if the record exists but cannot
    /// be removed.
    fn delete(&self) -> CommonResult<()>;
}

/// Capability to show a URL to the user, normally the system browser
pub trait UrlOpener: Send + Sync {
    /// # Errors
    /// Returns a message describing why the URL could not be opened.
    fn open(&self, url: &str) -> Result<(), String>;
}
