//! OAuth 2.0 authorization-code client with PKCE
//!
//! Handles the protocol side of a desktop sign-in:
//! - PKCE challenge and state generation
//! - Authorization URL building (always with `prompt=login`)
//! - Authorization code exchange
//! - Refresh token redemption

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::pkce::PkceChallenge;
use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, ProviderError, TokenResponse, TokenSet};

/// Error type for OAuth client operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed (connect, timeout, TLS)
    RequestFailed(reqwest::Error),

    /// The provider returned an OAuth error object
    Provider(ProviderError),

    /// Non-success status without a parseable error object
    HttpStatus { status: u16, body: String },

    /// Failed to parse a success response
    ParseError(String),

    /// No refresh token available
    NoRefreshToken,

    /// Invalid configuration
    ConfigError(String),
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::Provider(e) => write!(f, "OAuth error: {e}"),
            Self::HttpStatus { status, .. } => write!(f, "Token endpoint returned HTTP {status}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OAuthClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// Authorization request prepared for one sign-in attempt.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL to open in the browser
    pub url: String,
    /// Secret kept for the code exchange
    pub code_verifier: String,
    /// Anti-forgery value expected back on the redirect
    pub state: String,
}

/// OAuth 2.0 public client with PKCE support
///
/// Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) against the Azure
/// AD B2C v2.0 endpoints.
#[derive(Debug, Clone)]
pub struct PkceOAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl PkceOAuthClient {
    /// Create a new OAuth client with the given configuration
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` if the HTTP client cannot be
    /// built.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    ///
    /// use deskauth_common::auth::{OAuthConfig, PkceOAuthClient};
    ///
    /// let config = OAuthConfig::new(
    ///     "client_id",
    ///     "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/authorize",
    ///     "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/token",
    ///     Duration::from_secs(30),
    /// );
    /// let client = PkceOAuthClient::new(config)?;
    /// # Ok::<(), deskauth_common::auth::OAuthClientError>(())
    /// ```
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthClientError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| OAuthClientError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Build the authorization URL for a browser-based login.
    ///
    /// A fresh verifier and state are generated for every call.
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` if the authorize endpoint is
    /// empty.
    pub fn build_authorization_url(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, OAuthClientError> {
        if self.config.authorize_endpoint.is_empty() {
            return Err(OAuthClientError::ConfigError("authorize endpoint is empty".to_string()));
        }

        let challenge = PkceChallenge::generate();
        let scope = scopes.join(" ");

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("response_mode", "query"),
            ("scope", scope.as_str()),
            ("code_challenge", challenge.code_challenge.as_str()),
            ("code_challenge_method", challenge.challenge_method()),
            ("state", challenge.state.as_str()),
            ("prompt", "login"),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.config.authorize_endpoint.contains('?') { '&' } else { '?' };
        let url = format!("{}{separator}{query_string}", self.config.authorize_endpoint);

        Ok(AuthorizationRequest {
            url,
            code_verifier: challenge.code_verifier,
            state: challenge.state,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// Returns error if:
    /// - The provider rejects the code/verifier pair (`Provider`)
    /// - The request fails (`RequestFailed`)
    /// - The response cannot be parsed (`ParseError`)
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
        ];

        debug!(endpoint = %self.config.token_endpoint, "exchanging authorization code");
        self.post_token_request(&form, scopes).await
    }

    /// Redeem a refresh token for a new token set.
    ///
    /// When the provider does not rotate the refresh token, the one passed
    /// in is carried over.
    ///
    /// # Errors
    /// Returns `NoRefreshToken` for an empty token, otherwise the same
    /// errors as [`PkceOAuthClient::exchange_code`].
    pub async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        debug!(endpoint = %self.config.token_endpoint, "redeeming refresh token");
        let mut tokens = self.post_token_request(&form, scopes).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    async fn post_token_request(
        &self,
        form: &[(&str, &str)],
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        let response = self.client.post(&self.config.token_endpoint).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ProviderError>(&body).map_or_else(
                |_| OAuthClientError::HttpStatus { status: status.as_u16(), body },
                OAuthClientError::Provider,
            ));
        }

        let token_response: TokenResponse =
            serde_json::from_str(&body).map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        token_response.into_token_set(scopes).map_err(OAuthClientError::ParseError)
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub const fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl OAuthClientTrait for PkceOAuthClient {
    fn build_authorization_url(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, OAuthClientError> {
        Self::build_authorization_url(self, scopes, redirect_uri)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        Self::exchange_code(self, code, code_verifier, redirect_uri, scopes).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        Self::refresh(self, refresh_token, scopes).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::auth::pkce::generate_code_challenge;

    const AUTHORITY: &str = "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin";

    fn create_test_client() -> PkceOAuthClient {
        PkceOAuthClient::new(OAuthConfig::new(
            "test_client_id",
            format!("{AUTHORITY}/oauth2/v2.0/authorize"),
            format!("{AUTHORITY}/oauth2/v2.0/token"),
            Duration::from_secs(5),
        ))
        .unwrap()
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        let parsed = url::Url::parse(url).unwrap();
        parsed.query_pairs().into_owned().collect()
    }

    /// Validates `PkceOAuthClient::build_authorization_url` behavior for the
    /// authorization url scenario.
    ///
    /// Assertions:
    /// - Ensures the URL targets the B2C authorize endpoint.
    /// - Confirms every required query parameter is present.
    /// - Confirms `prompt=login` is always set.
    /// - Confirms the challenge is the S256 hash of the returned verifier.
    #[test]
    fn test_build_authorization_url() {
        let client = create_test_client();
        let scopes = vec!["openid".to_string(), "offline_access".to_string()];

        let request = client.build_authorization_url(&scopes, "http://localhost:8000").unwrap();

        assert!(request.url.starts_with(&format!("{AUTHORITY}/oauth2/v2.0/authorize?")));
        let query = query_of(&request.url);
        assert_eq!(query["client_id"], "test_client_id");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["redirect_uri"], "http://localhost:8000");
        assert_eq!(query["scope"], "openid offline_access");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["prompt"], "login");
        assert_eq!(query["state"], request.state);
        assert_eq!(query["code_challenge"], generate_code_challenge(&request.code_verifier));
    }

    /// Validates `PkceOAuthClient::build_authorization_url` behavior for the
    /// fresh secrets per attempt scenario.
    ///
    /// Assertions:
    /// - Confirms two requests never share a verifier or state.
    #[test]
    fn test_authorization_requests_are_unique() {
        let client = create_test_client();
        let a = client.build_authorization_url(&[], "http://localhost:8000").unwrap();
        let b = client.build_authorization_url(&[], "http://localhost:8000").unwrap();

        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, b.state);
    }

    /// Validates `PkceOAuthClient::refresh` behavior for the refresh with
    /// empty token scenario.
    ///
    /// Assertions:
    /// - Ensures `matches!(result, Err(OAuthClientError::NoRefreshToken))`
    ///   evaluates to true.
    #[tokio::test]
    async fn test_refresh_with_empty_token() {
        let client = create_test_client();

        let result = client.refresh("", &[]).await;
        assert!(matches!(result, Err(OAuthClientError::NoRefreshToken)));
    }

    /// Validates `OAuthClientError` display for the provider error scenario.
    ///
    /// Assertions:
    /// - Confirms the provider code and description are rendered.
    #[test]
    fn test_provider_error_display() {
        let err = OAuthClientError::Provider(ProviderError {
            error: "invalid_grant".to_string(),
            error_description: Some("AADB2C90080: The provided grant has expired".to_string()),
        });
        assert_eq!(
            err.to_string(),
            "OAuth error: invalid_grant: AADB2C90080: The provided grant has expired"
        );
    }
}
