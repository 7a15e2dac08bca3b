//! OAuth 2.0 / OIDC types and structures
//!
//! Defines the token bundle returned by a sign-in, the identity of the
//! signed-in account, the parsed loopback redirect, and the wire formats of
//! the token endpoint.

use std::collections::BTreeSet;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OIDC scopes the provider never echoes back in the token response.
///
/// They are satisfied by any successful sign-in, so they are ignored when
/// checking whether a cached token covers a request.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// OAuth 2.0 tokens for one signed-in account.
///
/// Serialized as JSON inside the encrypted cache record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer access token; absent when only OIDC scopes were requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub access_token: Option<String>,

    /// Refresh token for silent renewal
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refresh_token: Option<String>,

    /// ID token (JWT) containing user claims (OpenID Connect)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id_token: Option<String>,

    /// Token type (always "Bearer" for OAuth 2.0)
    pub token_type: String,

    /// Granted scopes
    #[serde(default)]
    pub scopes: BTreeSet<String>,

    /// Absolute expiration timestamp (UTC)
    pub expires_at: DateTime<Utc>,

    /// Account the tokens were issued to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub account: Option<AccountIdentity>,
}

impl TokenSet {
    /// Check if the token is expired or will expire within the given
    /// threshold
    ///
    /// A threshold outside chrono's range counts as expired.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        Duration::try_seconds(threshold_seconds)
            .and_then(|threshold| Utc::now().checked_add_signed(threshold))
            .map_or(true, |deadline| deadline >= self.expires_at)
    }

    /// Seconds until expiration (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    /// Whether every requested scope was granted.
    ///
    /// Reserved OIDC scopes are always considered granted.
    #[must_use]
    pub fn covers_scopes(&self, requested: &[String]) -> bool {
        requested
            .iter()
            .filter(|scope| !RESERVED_SCOPES.contains(&scope.as_str()))
            .all(|scope| self.scopes.contains(scope))
    }

    /// Token to present to a resource server: the access token, or the ID
    /// token when the provider issued no access token.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.id_token.as_deref())
    }

    /// Scopes as a single space-separated string.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

/// Stable identifier for a signed-in user: subject + issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// `sub` claim, or `oid` for B2C tokens without one
    pub subject: String,
    /// `iss` claim
    pub issuer: String,
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: Option<String>,
    oid: Option<String>,
    iss: Option<String>,
    exp: Option<i64>,
}

impl AccountIdentity {
    /// Read the identity from an ID token's payload.
    ///
    /// The signature is not verified: the token arrived directly from the
    /// token endpoint over TLS and is only used as a cache key.
    #[must_use]
    pub fn from_id_token(id_token: &str) -> Option<Self> {
        let claims = decode_claims(id_token)?;
        let subject = claims.sub.or(claims.oid)?;
        let issuer = claims.iss?;
        Some(Self { subject, issuer })
    }

    /// `{subject}.{issuer}`, unique per account.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}.{}", self.subject, self.issuer)
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.subject, self.issuer)
    }
}

fn decode_claims(jwt: &str) -> Option<IdTokenClaims> {
    let mut parts = jwt.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return None,
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Parsed loopback redirect. Exactly one variant per captured request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    /// The user completed sign-in
    Code {
        /// Single-use authorization code
        code: String,
        /// Echoed `state`, compared against the one sent
        state: Option<String>,
    },
    /// The provider refused (e.g. `access_denied`)
    Error {
        /// OAuth error code
        error: String,
        /// Human-readable detail from the provider
        error_description: Option<String>,
    },
}

impl AuthorizationResponse {
    /// Build a response from redirect query parameters.
    ///
    /// Returns `None` when neither `code` nor `error` is present (favicon
    /// fetches, probes). `error` wins if both are present.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;

        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "code" => &mut code,
                "state" => &mut state,
                "error" => &mut error,
                "error_description" => &mut error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }

        match (error.filter(|e| !e.is_empty()), code.filter(|c| !c.is_empty())) {
            (Some(error), _) => Some(Self::Error { error, error_description }),
            (None, Some(code)) => Some(Self::Code { code, state }),
            (None, None) => None,
        }
    }

    /// Whether the provider refused the request.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Token endpoint success body (RFC 6749 §5.1, plus the B2C
/// `id_token_expires_in` extension).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Absent when only OIDC scopes were requested
    pub access_token: Option<String>,
    /// Present when `offline_access` was granted
    pub refresh_token: Option<String>,
    /// OIDC ID token (JWT)
    pub id_token: Option<String>,
    /// Usually `Bearer`
    pub token_type: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: Option<i64>,
    /// ID token lifetime in seconds (B2C)
    pub id_token_expires_in: Option<i64>,
    /// Space-separated granted scopes
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a [`TokenSet`].
    ///
    /// Granted scopes come from the response's `scope` field, falling back
    /// to the requested scopes when the provider omits it. Expiry comes from
    /// `expires_in`, then `id_token_expires_in`, then the ID token's `exp`.
    ///
    /// # Errors
    /// Returns a message when the response carries no usable token, no
    /// expiry, or a lifetime that cannot be represented.
    pub fn into_token_set(self, requested_scopes: &[String]) -> Result<TokenSet, String> {
        if self.access_token.is_none() && self.id_token.is_none() {
            return Err("token response contains neither access_token nor id_token".to_string());
        }

        let expires_at = match self.expires_in.or(self.id_token_expires_in) {
            Some(secs) => Duration::try_seconds(secs)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .ok_or_else(|| format!("token lifetime out of range: {secs}s"))?,
            None => self
                .id_token
                .as_deref()
                .and_then(decode_claims)
                .and_then(|claims| claims.exp)
                .and_then(|exp| DateTime::from_timestamp(exp, 0))
                .ok_or_else(|| "token response carries no expiry".to_string())?,
        };

        let scopes: BTreeSet<String> = match self.scope.as_deref() {
            Some(granted) if !granted.trim().is_empty() => {
                granted.split_whitespace().map(str::to_string).collect()
            }
            _ => requested_scopes.iter().cloned().collect(),
        };

        let account = self.id_token.as_deref().and_then(AccountIdentity::from_id_token);

        Ok(TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes,
            expires_at,
            account,
        })
    }
}

/// Error object returned by the authorization or token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// OAuth error code, e.g. `invalid_grant`
    pub error: String,
    /// Provider detail; B2C prefixes it with an `AADB2C` code
    pub error_description: Option<String>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Endpoints and identity of a registered public client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// `{authority}/oauth2/v2.0/authorize`
    pub authorize_endpoint: String,

    /// `{authority}/oauth2/v2.0/token`
    pub token_endpoint: String,

    /// Per-request timeout for token endpoint calls
    pub http_timeout: std::time::Duration,
}

impl OAuthConfig {
    /// Create a new OAuth configuration
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        authorize_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        http_timeout: std::time::Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            http_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::types.
    use super::*;

    fn jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.sig")
    }

    fn token_set(scopes: &[&str], expires_in: i64) -> TokenSet {
        TokenSet {
            access_token: Some("at".to_string()),
            refresh_token: None,
            id_token: None,
            token_type: "Bearer".to_string(),
            scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            account: None,
        }
    }

    /// Validates `TokenSet::is_expired` behavior for the threshold scenario.
    ///
    /// Assertions:
    /// - Ensures a token expiring in 10 minutes is valid with a 5 minute
    ///   threshold.
    /// - Ensures a token expiring in 2 minutes is stale with a 5 minute
    ///   threshold.
    #[test]
    fn test_is_expired_respects_threshold() {
        assert!(!token_set(&[], 600).is_expired(300));
        assert!(token_set(&[], 120).is_expired(300));
        assert!(token_set(&[], -1).is_expired(0));
    }

    /// Validates `TokenSet::covers_scopes` behavior for the reserved scopes
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures reserved OIDC scopes are ignored.
    /// - Ensures an API scope missing from the grant is not covered.
    #[test]
    fn test_covers_scopes_ignores_reserved() {
        let tokens = token_set(&["https://contoso/api/read"], 600);
        let openid_only = vec!["openid".to_string(), "offline_access".to_string()];
        let with_api = vec!["openid".to_string(), "https://contoso/api/read".to_string()];
        let with_write = vec!["https://contoso/api/write".to_string()];

        assert!(tokens.covers_scopes(&openid_only));
        assert!(tokens.covers_scopes(&with_api));
        assert!(!tokens.covers_scopes(&with_write));
    }

    /// Validates `AccountIdentity::from_id_token` behavior for the B2C claims
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `sub` and `iss` populate the identity.
    /// - Confirms `oid` is used when `sub` is absent.
    /// - Ensures malformed tokens yield `None`.
    #[test]
    fn test_account_identity_from_id_token() {
        let token = jwt(&serde_json::json!({"sub": "user-1", "iss": "https://issuer/v2.0/"}));
        let identity = AccountIdentity::from_id_token(&token).unwrap();
        assert_eq!(identity.subject, "user-1");
        assert_eq!(identity.key(), "user-1.https://issuer/v2.0/");

        let oid_only = jwt(&serde_json::json!({"oid": "object-9", "iss": "iss"}));
        assert_eq!(AccountIdentity::from_id_token(&oid_only).unwrap().subject, "object-9");

        assert!(AccountIdentity::from_id_token("not-a-jwt").is_none());
        assert!(AccountIdentity::from_id_token("a.b.c.d").is_none());
    }

    /// Validates `AuthorizationResponse::from_query_pairs` behavior for the
    /// redirect parsing scenario.
    ///
    /// Assertions:
    /// - Confirms a code redirect yields `Code` with its state.
    /// - Confirms an error redirect yields `Error` with its description.
    /// - Ensures a redirect with neither yields `None`.
    /// - Ensures `error` takes precedence over `code`.
    #[test]
    fn test_authorization_response_from_query_pairs() {
        let code = AuthorizationResponse::from_query_pairs([("code", "abc"), ("state", "xyz")]);
        assert_eq!(
            code,
            Some(AuthorizationResponse::Code {
                code: "abc".to_string(),
                state: Some("xyz".to_string())
            })
        );

        let error = AuthorizationResponse::from_query_pairs([
            ("error", "access_denied"),
            ("error_description", "AADB2C90091: The user has cancelled"),
        ])
        .unwrap();
        assert!(error.is_error());

        assert!(AuthorizationResponse::from_query_pairs([("foo", "bar")]).is_none());
        assert!(AuthorizationResponse::from_query_pairs([("code", "")]).is_none());

        let both = AuthorizationResponse::from_query_pairs([("code", "abc"), ("error", "server_error")]);
        assert!(both.unwrap().is_error());
    }

    /// Validates `TokenResponse::into_token_set` behavior for the B2C id-token
    /// only scenario.
    ///
    /// Assertions:
    /// - Confirms `id_token_expires_in` is used when `expires_in` is absent.
    /// - Confirms requested scopes are used when `scope` is absent.
    /// - Confirms the account is derived from the ID token.
    #[test]
    fn test_token_response_id_token_only() {
        let response = TokenResponse {
            access_token: None,
            refresh_token: Some("rt".to_string()),
            id_token: Some(jwt(&serde_json::json!({"sub": "u", "iss": "i"}))),
            token_type: None,
            expires_in: None,
            id_token_expires_in: Some(3600),
            scope: None,
        };
        let requested = vec!["openid".to_string(), "offline_access".to_string()];
        let tokens = response.into_token_set(&requested).unwrap();

        assert!(tokens.seconds_until_expiry() > 3500);
        assert_eq!(tokens.scope_string(), "offline_access openid");
        assert_eq!(tokens.account.as_ref().unwrap().subject, "u");
        assert!(tokens.bearer().is_some());
        assert_eq!(tokens.token_type, "Bearer");
    }

    /// Validates `TokenResponse::into_token_set` behavior for the missing
    /// token scenario.
    ///
    /// Assertions:
    /// - Ensures a response without any token is rejected.
    /// - Ensures a response without any expiry source is rejected.
    #[test]
    fn test_token_response_rejects_incomplete_bodies() {
        let empty = TokenResponse {
            access_token: None,
            refresh_token: None,
            id_token: None,
            token_type: None,
            expires_in: Some(10),
            id_token_expires_in: None,
            scope: None,
        };
        assert!(empty.into_token_set(&[]).is_err());

        let no_expiry = TokenResponse {
            access_token: Some("at".to_string()),
            refresh_token: None,
            id_token: None,
            token_type: None,
            expires_in: None,
            id_token_expires_in: None,
            scope: None,
        };
        assert!(no_expiry.into_token_set(&[]).is_err());
    }

    /// Validates `TokenResponse::into_token_set` behavior for the oversized
    /// lifetime scenario.
    ///
    /// Assertions:
    /// - Ensures an `expires_in` beyond chrono's range is an error, not a
    ///   panic.
    /// - Ensures an oversized `id_token_expires_in` is rejected the same way.
    #[test]
    fn test_token_response_rejects_out_of_range_lifetime() {
        let huge = TokenResponse {
            access_token: Some("at".to_string()),
            refresh_token: None,
            id_token: None,
            token_type: None,
            expires_in: Some(i64::MAX),
            id_token_expires_in: None,
            scope: None,
        };
        let err = huge.into_token_set(&[]).unwrap_err();
        assert!(err.contains("out of range"), "unexpected error: {err}");

        let huge_id = TokenResponse {
            access_token: None,
            refresh_token: None,
            id_token: Some(jwt(&serde_json::json!({"sub": "u", "iss": "i"}))),
            token_type: None,
            expires_in: None,
            id_token_expires_in: Some(i64::MIN),
            scope: None,
        };
        assert!(huge_id.into_token_set(&[]).is_err());
    }

    /// An out-of-range refresh threshold treats the token as expired
    /// instead of overflowing.
    #[test]
    fn test_is_expired_with_extreme_threshold() {
        let tokens = token_set(&[], 600);
        assert!(tokens.is_expired(i64::MAX));
        assert!(!tokens.is_expired(0));
    }

    /// Validates `TokenSet` serde behavior for the cache record scenario.
    ///
    /// Assertions:
    /// - Confirms a serialized token set deserializes to an equal value.
    #[test]
    fn test_token_set_json_round_trip() {
        let mut tokens = token_set(&["openid", "api"], 3600);
        tokens.account = Some(AccountIdentity { subject: "s".into(), issuer: "i".into() });
        let json = serde_json::to_string(&tokens).unwrap();
        let back: TokenSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tokens);
    }
}
