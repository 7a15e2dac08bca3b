//! Shared helpers for infra integration tests: a simulated browser, a
//! configuration pointed at a mock tenant and a tracing capture.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use deskauth_common::auth::{OAuthConfig, PkceOAuthClient};
use deskauth_common::testing::RecordingUrlOpener;
use deskauth_domain::AuthConfig;
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use wiremock::MockServer;

/// Authority path served by the mock tenant.
pub const AUTHORITY_PATH: &str = "/contoso.onmicrosoft.com/B2C_1_signin";

/// Token endpoint path under [`AUTHORITY_PATH`].
pub const TOKEN_ENDPOINT_PATH: &str = "/contoso.onmicrosoft.com/B2C_1_signin/oauth2/v2.0/token";

/// HTTP client that behaves like a browser on the same machine.
pub fn browser_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().expect("http client should build")
}

/// `http://localhost:{port}` resolved to the address the listener binds.
pub fn loopback_url(port: u16, path_and_query: &str) -> String {
    format!("http://127.0.0.1:{port}{path_and_query}")
}

/// Sign-in configuration for app `DeskAuthTest` with short deadlines.
pub fn offline_config(base_port: u16) -> AuthConfig {
    let mut config = AuthConfig::b2c("test-client", "contoso", "B2C_1_signin", "DeskAuthTest");
    config.redirect_base_port = base_port;
    config.port_attempts = 3;
    config.interaction_timeout_secs = 10;
    config.shutdown_timeout_secs = 2;
    config.http_timeout_secs = 5;
    config
}

/// [`offline_config`] with its authority served by `server`.
pub fn test_config(server: &MockServer, base_port: u16) -> AuthConfig {
    let mut config = offline_config(base_port);
    config.authority = Some(format!("{}{AUTHORITY_PATH}", server.uri()));
    config
}

/// Real protocol client for `config`.
pub fn pkce_client(config: &AuthConfig) -> PkceOAuthClient {
    let oauth = OAuthConfig::new(
        config.client_id.clone(),
        config.authorize_endpoint().expect("authorize endpoint"),
        config.token_endpoint().expect("token endpoint"),
        config.http_timeout(),
    );
    PkceOAuthClient::new(oauth).expect("client should build")
}

/// Unsigned JWT carrying `claims`, as far as the client reads it.
pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Form-encode redirect query parameters.
pub fn redirect_query(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
}

/// Read one query parameter from an authorization URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(url).ok()?;
    url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
}

/// Browser double that follows the authorization URL straight back to the
/// redirect URI, with a query built from the request's `state`.
///
/// Must be used from inside a tokio runtime: the redirect is sent from a
/// spawned task so the caller can start waiting for it.
pub fn redirecting_browser(
    make_query: impl Fn(&str) -> String + Send + Sync + 'static,
) -> RecordingUrlOpener {
    RecordingUrlOpener::with_hook(move |authorize_url| {
        let redirect_uri =
            query_param(authorize_url, "redirect_uri").expect("authorization URL has redirect_uri");
        let state = query_param(authorize_url, "state").unwrap_or_default();
        let target = format!(
            "{}/?{}",
            redirect_uri.replace("localhost", "127.0.0.1"),
            make_query(&state)
        );

        tokio::spawn(async move {
            let _ = browser_client().get(target).send().await;
        });
    })
}

/// Port of the redirect URI in the first URL `opener` was asked to open.
pub fn opened_redirect_port(opener: &RecordingUrlOpener) -> u16 {
    let opened = opener.opened();
    let url = opened.first().expect("browser should have been opened");
    let redirect_uri = query_param(url, "redirect_uri").expect("redirect_uri present");
    url::Url::parse(&redirect_uri).ok().and_then(|u| u.port()).expect("redirect_uri has a port")
}

/// Whether `port` can be bound on the loopback interface right now.
///
/// Binds the way the capture server does, so connections of a closed
/// listener lingering in `TIME_WAIT` do not count as occupying the port.
pub async fn port_is_free(port: u16) -> bool {
    let v4_free = tokio::net::TcpListener::bind(("127.0.0.1", port)).await.is_ok();
    let v6_free = match tokio::net::TcpListener::bind(("::1", port)).await {
        Ok(_) => true,
        Err(e) => e.kind() != std::io::ErrorKind::AddrInUse,
    };
    v4_free && v6_free
}

/// Whether this host can bind the IPv6 loopback address.
pub fn ipv6_loopback_available() -> bool {
    std::net::TcpListener::bind(("::1", 0)).is_ok()
}

/// `loopback_url` over IPv6, as a browser resolving `localhost` to `::1`
/// would send it.
pub fn loopback_url_v6(port: u16, path_and_query: &str) -> String {
    format!("http://[::1]:{port}{path_and_query}")
}

/// Hold `port` on the IPv6 loopback only.
pub fn occupy_ipv6_port(port: u16) -> std::net::TcpListener {
    std::net::TcpListener::bind(("::1", port)).expect("IPv6 port should be free")
}

/// Hold `count` consecutive loopback ports starting at `base`.
pub fn occupy_ports(base: u16, count: u16) -> Vec<std::net::TcpListener> {
    (base..base + count)
        .map(|port| std::net::TcpListener::bind(("127.0.0.1", port)).expect("port should be free"))
        .collect()
}

/// Formatted tracing output of the deskauth crates, captured for the
/// current thread.
///
/// With the default current-thread test runtime every spawned task runs on
/// the test thread, so the capture sees the listener's events too.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Install a capturing subscriber until the guard is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(move || writer.clone()))
            .with(
                Targets::new()
                    .with_target("deskauth_common", Level::TRACE)
                    .with_target("deskauth_infra", Level::TRACE),
            );
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().expect("log buffer lock")).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
