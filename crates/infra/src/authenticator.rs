//! Sign-in orchestration.
//!
//! [`Authenticator`] tries silent acquisition first (cached token, then
//! refresh) and only falls back to the interactive browser flow on a miss:
//!
//! ```text
//! authenticate(scopes)
//!   ├─ silent ──────────────► hit: return (no listener, no browser)
//!   └─ miss
//!       ├─ LoopbackCaptureServer::start(base_port, attempts)
//!       ├─ open authorization URL
//!       ├─ wait for redirect (bounded)
//!       ├─ validate state, exchange code, persist
//!       └─ shutdown listener (every path)
//! ```

use std::sync::Arc;

use deskauth_common::auth::{
    validate_state, AccountIdentity, AuthorizationResponse, OAuthClientError, OAuthClientTrait,
    OAuthConfig, PkceOAuthClient, SilentAcquisition, TokenSet, TokenStoreTrait, UrlOpener,
};
use deskauth_common::error::ErrorClassification;
use deskauth_domain::{AuthConfig, AuthError, Result};
use tracing::{debug, info, instrument, warn};

use crate::loopback::LoopbackCaptureServer;
use crate::platform::{machine_identity, SystemBrowser};
use crate::storage::SecureTokenStore;

/// Orchestrates silent and interactive sign-in for one application.
pub struct Authenticator<C = PkceOAuthClient, S = SecureTokenStore> {
    config: AuthConfig,
    client: C,
    store: S,
    opener: Arc<dyn UrlOpener>,
}

impl<C, S> std::fmt::Debug for Authenticator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_id", &self.config.client_id)
            .field("app_name", &self.config.app_name)
            .finish_non_exhaustive()
    }
}

impl Authenticator<PkceOAuthClient, SecureTokenStore> {
    /// Wire the B2C client, the encrypted file cache and the system browser
    /// from `config`.
    ///
    /// # Errors
    /// Returns `AuthError::Config` for an invalid configuration and
    /// `AuthError::Persistence` / `AuthError::Internal` if the cache cannot
    /// be opened.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        config.validate()?;

        let oauth = OAuthConfig::new(
            config.client_id.clone(),
            config.authorize_endpoint()?,
            config.token_endpoint()?,
            config.http_timeout(),
        );
        let client = PkceOAuthClient::new(oauth).map_err(map_oauth_client_error)?;

        let machine_id = machine_identity()?;
        let store = match &config.cache_dir {
            Some(dir) => SecureTokenStore::open_in(dir.clone(), &config.app_name, &machine_id)?,
            None => SecureTokenStore::open(&config.app_name, &machine_id)?,
        };

        Ok(Self::new(config.clone(), client, store, Arc::new(SystemBrowser)))
    }
}

impl<C, S> Authenticator<C, S>
where
    C: OAuthClientTrait,
    S: TokenStoreTrait,
{
    /// Build an authenticator from explicit seams; [`Authenticator::from_config`]
    /// wires the production ones.
    pub fn new(config: AuthConfig, client: C, store: S, opener: Arc<dyn UrlOpener>) -> Self {
        Self { config, client, store, opener }
    }

    /// Configuration this authenticator was built with.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Token store backing silent sign-in.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Return a token for `scopes` (merged with the configured defaults),
    /// signing in interactively only when no cached or refreshable token
    /// covers them.
    ///
    /// # Errors
    /// Any [`AuthError`] from the interactive flow. Persisting the new token
    /// is best effort and never fails the call.
    #[instrument(skip_all, fields(requested = scopes.len()))]
    pub async fn authenticate(&self, scopes: &[String]) -> Result<TokenSet> {
        let scopes = self.config.merged_scopes(scopes);

        if let Some(tokens) = self.acquire_silent(&scopes).await {
            return Ok(tokens);
        }

        let result = self.authenticate_interactive(&scopes).await;
        if let Err(err) = &result {
            warn!(error = %err, kind = err.label(), "interactive sign-in failed");
        }
        result
    }

    /// [`Authenticator::authenticate`] for callers that only care whether a
    /// token was obtained. Failures are logged, not returned.
    pub async fn authenticate_or_none(&self, scopes: &[String]) -> Option<TokenSet> {
        self.authenticate(scopes).await.ok()
    }

    /// Cached or refreshed token for `scopes`, without any user interaction.
    pub async fn acquire_silent(&self, scopes: &[String]) -> Option<TokenSet> {
        let cached = self.store.load();
        let acquisition = self
            .client
            .silent(scopes, cached.as_ref(), self.config.refresh_threshold_secs)
            .await?;

        match acquisition {
            SilentAcquisition::Cached(tokens) => {
                debug!("silent sign-in from cache");
                Some(tokens)
            }
            SilentAcquisition::Refreshed(tokens) => {
                info!(expires_in = tokens.seconds_until_expiry(), "silent sign-in via refresh");
                self.persist(&tokens);
                Some(tokens)
            }
        }
    }

    /// Forget the signed-in user by deleting the token cache.
    ///
    /// # Errors
    /// Returns `AuthError::Persistence` if the cache exists but cannot be
    /// removed.
    pub fn logout(&self) -> Result<()> {
        self.store.delete().map_err(|e| AuthError::Persistence(e.to_string()))?;
        info!("signed out");
        Ok(())
    }

    /// Account of the cached token, read locally without network access.
    #[must_use]
    pub fn cached_account(&self) -> Option<AccountIdentity> {
        self.store.load().and_then(|tokens| tokens.account)
    }

    /// The cached token as stored, valid or not.
    #[must_use]
    pub fn cached_tokens(&self) -> Option<TokenSet> {
        self.store.load()
    }

    async fn authenticate_interactive(&self, scopes: &[String]) -> Result<TokenSet> {
        let mut server = LoopbackCaptureServer::start(
            self.config.redirect_base_port,
            self.config.port_attempts,
        )
        .await?;

        let outcome = self.run_interactive(&mut server, scopes).await;
        server.shutdown(self.config.shutdown_timeout()).await;
        outcome
    }

    async fn run_interactive(
        &self,
        server: &mut LoopbackCaptureServer,
        scopes: &[String],
    ) -> Result<TokenSet> {
        let redirect_uri = server.redirect_uri();
        let request = self
            .client
            .build_authorization_url(scopes, &redirect_uri)
            .map_err(map_oauth_client_error)?;

        info!(port = server.port(), "opening browser for interactive sign-in");
        self.opener.open(&request.url).map_err(AuthError::Browser)?;

        let Some(response) = server.wait_for_response(self.config.interaction_timeout()).await
        else {
            return Err(AuthError::Timeout { seconds: self.config.interaction_timeout_secs });
        };

        match response {
            AuthorizationResponse::Error { error, error_description } => {
                Err(AuthError::Authorization { code: error, description: error_description })
            }
            AuthorizationResponse::Code { code, state } => {
                let state_matches =
                    state.as_deref().is_some_and(|returned| validate_state(&request.state, returned));
                if !state_matches {
                    return Err(AuthError::StateMismatch);
                }

                let tokens = self
                    .client
                    .exchange_code(&code, &request.code_verifier, &redirect_uri, scopes)
                    .await
                    .map_err(map_oauth_client_error)?;

                self.persist(&tokens);
                info!(expires_in = tokens.seconds_until_expiry(), "interactive sign-in complete");
                Ok(tokens)
            }
        }
    }

    fn persist(&self, tokens: &TokenSet) {
        if let Err(err) = self.store.save(tokens) {
            warn!(
                error = %err,
                retryable = err.is_retryable(),
                "failed to persist tokens; continuing with in-memory token"
            );
        }
    }
}

fn map_oauth_client_error(err: OAuthClientError) -> AuthError {
    match err {
        OAuthClientError::RequestFailed(e) => AuthError::Network(e.to_string()),
        OAuthClientError::Provider(e) => {
            AuthError::TokenExchange { code: e.error, description: e.error_description }
        }
        OAuthClientError::HttpStatus { status, .. } if status >= 500 => {
            AuthError::Network(format!("token endpoint returned HTTP {status}"))
        }
        OAuthClientError::HttpStatus { status, .. } => {
            AuthError::TokenExchange { code: format!("http_{status}"), description: None }
        }
        OAuthClientError::ParseError(msg) => {
            AuthError::TokenExchange { code: "invalid_response".to_string(), description: Some(msg) }
        }
        OAuthClientError::NoRefreshToken => {
            AuthError::Internal("no refresh token available".to_string())
        }
        OAuthClientError::ConfigError(msg) => AuthError::Config(msg),
    }
}

#[cfg(test)]
mod tests {
    use deskauth_common::auth::ProviderError;

    use super::*;

    #[test]
    fn test_map_provider_error_to_token_exchange() {
        let err = map_oauth_client_error(OAuthClientError::Provider(ProviderError {
            error: "invalid_grant".to_string(),
            error_description: Some("expired".to_string()),
        }));

        assert_eq!(
            err,
            AuthError::TokenExchange {
                code: "invalid_grant".to_string(),
                description: Some("expired".to_string())
            }
        );
    }

    #[test]
    fn test_map_http_status_by_class() {
        let server_error =
            map_oauth_client_error(OAuthClientError::HttpStatus { status: 502, body: String::new() });
        let client_error =
            map_oauth_client_error(OAuthClientError::HttpStatus { status: 401, body: String::new() });

        assert!(server_error.is_retryable());
        assert!(matches!(client_error, AuthError::TokenExchange { ref code, .. } if code == "http_401"));
    }
}
