//! Mock implementations of the sign-in seams
//!
//! Provides in-memory doubles for the protocol client, the token store and
//! the URL opener, each recording how it was called.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use crate::auth::{
    AccountIdentity, AuthorizationRequest, OAuthClientError, OAuthClientTrait, ProviderError,
    TokenSet, TokenStoreTrait, UrlOpener,
};
use crate::error::{CommonError, CommonResult};

/// Build a valid token set for tests.
#[must_use]
pub fn sample_tokens(scopes: &[&str], expires_in_secs: i64) -> TokenSet {
    TokenSet {
        access_token: Some(format!("access-{}", uuid::Uuid::new_v4())),
        refresh_token: Some(format!("refresh-{}", uuid::Uuid::new_v4())),
        id_token: None,
        token_type: "Bearer".to_string(),
        scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
        expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        account: Some(AccountIdentity {
            subject: "test-subject".to_string(),
            issuer: "https://test.b2clogin.com/tfp/v2.0/".to_string(),
        }),
    }
}

/// Arguments seen by [`MockOAuthClient::exchange_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCall {
    /// Authorization code presented
    pub code: String,
    /// PKCE verifier presented
    pub code_verifier: String,
    /// Redirect URI presented
    pub redirect_uri: String,
    /// Scopes requested
    pub scopes: Vec<String>,
}

/// Mock OAuth client that simulates the protocol without network calls.
///
/// Authorization URLs point at `https://mock.b2c.test/authorize` and carry
/// the real query parameters, so a simulated browser can read
/// `redirect_uri` and `state` from them.
#[derive(Clone, Debug)]
pub struct MockOAuthClient {
    exchange_outcome: Arc<Mutex<Result<TokenSet, ProviderError>>>,
    refresh_outcome: Arc<Mutex<Result<TokenSet, ProviderError>>>,
    exchange_calls: Arc<Mutex<Vec<ExchangeCall>>>,
    refresh_calls: Arc<AtomicUsize>,
    authorize_calls: Arc<AtomicUsize>,
}

impl MockOAuthClient {
    /// Create a mock whose exchange and refresh both succeed.
    pub fn new() -> Self {
        Self {
            exchange_outcome: Arc::new(Mutex::new(Ok(sample_tokens(&["openid"], 3600)))),
            refresh_outcome: Arc::new(Mutex::new(Ok(sample_tokens(&["openid"], 3600)))),
            exchange_calls: Arc::new(Mutex::new(Vec::new())),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            authorize_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the tokens returned by `exchange_code`.
    pub fn set_exchange_response(&self, tokens: TokenSet) {
        *self.exchange_outcome.lock() = Ok(tokens);
    }

    /// Make `exchange_code` fail with a provider error.
    pub fn set_exchange_error(&self, error: &str, description: Option<&str>) {
        *self.exchange_outcome.lock() = Err(ProviderError {
            error: error.to_string(),
            error_description: description.map(str::to_string),
        });
    }

    /// Configure the tokens returned by `refresh`.
    pub fn set_refresh_response(&self, tokens: TokenSet) {
        *self.refresh_outcome.lock() = Ok(tokens);
    }

    /// Make `refresh` fail with a provider error.
    pub fn set_refresh_error(&self, error: &str) {
        *self.refresh_outcome.lock() =
            Err(ProviderError { error: error.to_string(), error_description: None });
    }

    /// Exchange calls observed so far.
    #[must_use]
    pub fn exchange_calls(&self) -> Vec<ExchangeCall> {
        self.exchange_calls.lock().clone()
    }

    /// Number of refresh calls.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of authorization URLs built.
    #[must_use]
    pub fn authorize_count(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    fn build_authorization_url(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, OAuthClientError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        let state = format!("state-{}", uuid::Uuid::new_v4().simple());
        let url = format!(
            "https://mock.b2c.test/authorize?redirect_uri={}&state={}&scope={}&prompt=login",
            urlencoding::encode(redirect_uri),
            state,
            urlencoding::encode(&scopes.join(" "))
        );
        Ok(AuthorizationRequest { url, code_verifier: "mock-verifier".to_string(), state })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        self.exchange_calls.lock().push(ExchangeCall {
            code: code.to_string(),
            code_verifier: code_verifier.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.to_vec(),
        });
        self.exchange_outcome.lock().clone().map_err(OAuthClientError::Provider)
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        _scopes: &[String],
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }
        self.refresh_outcome.lock().clone().map_err(OAuthClientError::Provider)
    }
}

/// In-memory token store.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    record: Arc<Mutex<Option<TokenSet>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `tokens`.
    pub fn with_tokens(tokens: TokenSet) -> Self {
        let store = Self::default();
        *store.record.lock() = Some(tokens);
        store
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// Record currently held.
    #[must_use]
    pub fn current(&self) -> Option<TokenSet> {
        self.record.lock().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStoreTrait for MemoryTokenStore {
    fn save(&self, tokens: &TokenSet) -> CommonResult<()> {
        if *self.fail_saves.lock() {
            return Err(CommonError::persistence_op("save", "simulated disk full"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.record.lock() = Some(tokens.clone());
        Ok(())
    }

    fn load(&self) -> Option<TokenSet> {
        self.record.lock().clone()
    }

    fn delete(&self) -> CommonResult<()> {
        *self.record.lock() = None;
        Ok(())
    }
}

type OpenHook = Arc<dyn Fn(&str) + Send + Sync>;

/// URL opener that records every URL and optionally reacts to it, e.g. by
/// simulating the browser hitting the redirect URI.
#[derive(Clone, Default)]
pub struct RecordingUrlOpener {
    opened: Arc<Mutex<Vec<String>>>,
    hook: Option<OpenHook>,
    fail: bool,
}

impl std::fmt::Debug for RecordingUrlOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingUrlOpener")
            .field("opened", &self.opened.lock().len())
            .field("hook", &self.hook.is_some())
            .field("fail", &self.fail)
            .finish()
    }
}

impl RecordingUrlOpener {
    /// Create an opener that records URLs and succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with every opened URL.
    pub fn with_hook(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self { hook: Some(Arc::new(hook)), ..Self::default() }
    }

    /// An opener that always fails, like a headless session.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// URLs opened so far.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl UrlOpener for RecordingUrlOpener {
    fn open(&self, url: &str) -> Result<(), String> {
        self.opened.lock().push(url.to_string());
        if self.fail {
            return Err("no browser available".to_string());
        }
        if let Some(hook) = &self.hook {
            hook(url);
        }
        Ok(())
    }
}
