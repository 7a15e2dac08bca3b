//! Loopback HTTP listener that captures the authorization redirect.

use std::future::IntoFuture;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use deskauth_common::auth::AuthorizationResponse;
use deskauth_domain::constants::{LOOPBACK_HOST, LOOPBACK_HOST_V6, REDIRECT_HOST};
use deskauth_domain::{AuthError, Result};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pages::{ERROR_PAGE, SUCCESS_PAGE};

/// Lifecycle of one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Listening, nothing captured yet
    Awaiting,
    /// A redirect carrying `code` or `error` was captured
    Received,
    /// The caller stopped waiting before a redirect arrived
    TimedOut,
    /// The listener has been shut down
    Closed,
}

#[derive(Debug)]
struct CaptureSession {
    status: CaptureStatus,
    captured: Option<AuthorizationResponse>,
    notifier: Option<oneshot::Sender<AuthorizationResponse>>,
}

type SharedSession = Arc<Mutex<CaptureSession>>;

/// Single-use listener on the loopback interface for the OAuth redirect.
///
/// Binds `127.0.0.1` and, where the host has IPv6 loopback, `[::1]` on the
/// same port, so `localhost` reaches it whichever family the browser tries
/// first. Serves any GET path. The first request whose query carries `code` or
/// `error` is captured; every later request still gets a page but leaves the
/// capture untouched.
pub struct LoopbackCaptureServer {
    port: u16,
    session: SharedSession,
    receiver: Option<oneshot::Receiver<AuthorizationResponse>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LoopbackCaptureServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackCaptureServer")
            .field("port", &self.port)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl LoopbackCaptureServer {
    /// Bind the first free port in `base_port..base_port + max_attempts`.
    ///
    /// A port counts as free only if no other process holds it on either
    /// loopback family.
    ///
    /// # Errors
    /// Returns `AuthError::PortExhaustion` if every candidate port is taken
    /// and `AuthError::Config` if `max_attempts` is zero.
    pub async fn start(base_port: u16, max_attempts: u16) -> Result<Self> {
        if max_attempts == 0 {
            return Err(AuthError::Config("port attempts must be at least 1".to_string()));
        }

        let mut last_port = base_port;
        let mut bound = None;
        for offset in 0..max_attempts {
            let Some(port) = base_port.checked_add(offset) else {
                break;
            };
            last_port = port;
            match bind_loopback(port).await {
                Ok(listeners) => {
                    bound = Some((listeners, port));
                    break;
                }
                Err(e) => debug!(port, error = %e, "loopback port unavailable"),
            }
        }

        let Some(((listener, listener_v6), port)) = bound else {
            warn!(base_port, last_port, "no free loopback port");
            return Err(AuthError::PortExhaustion { base_port, last_port });
        };

        let (notifier, receiver) = oneshot::channel();
        let session = Arc::new(Mutex::new(CaptureSession {
            status: CaptureStatus::Awaiting,
            captured: None,
            notifier: Some(notifier),
        }));

        let app = Router::new()
            .route("/", get(capture_redirect))
            .route("/{*path}", get(capture_redirect))
            .with_state(session.clone());

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let dual_stack = listener_v6.is_some();
        let handle = tokio::spawn(async move {
            let shutdown_v6 = shutdown.clone();
            let v4 = axum::serve(listener, app.clone())
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .into_future();

            let (v4_result, v6_result) = match listener_v6 {
                Some(listener_v6) => {
                    let v6 = axum::serve(listener_v6, app)
                        .with_graceful_shutdown(async move { shutdown_v6.cancelled().await })
                        .into_future();
                    let (v4_result, v6_result) = tokio::join!(v4, v6);
                    (v4_result, Some(v6_result))
                }
                None => (v4.await, None),
            };

            for err in v4_result.err().into_iter().chain(v6_result.and_then(|r| r.err())) {
                error!("loopback listener error: {}", err);
            }
        });

        info!(port, dual_stack, "loopback listener started");

        Ok(Self { port, session, receiver: Some(receiver), cancel, handle: Some(handle) })
    }

    /// Port the listener is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI registered with the provider: `http://localhost:{port}`.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://{REDIRECT_HOST}:{}", self.port)
    }

    /// Current lifecycle state of the capture.
    #[must_use]
    pub fn status(&self) -> CaptureStatus {
        self.session.lock().status
    }

    /// The captured redirect, if any.
    #[must_use]
    pub fn captured(&self) -> Option<AuthorizationResponse> {
        self.session.lock().captured.clone()
    }

    /// Wait up to `timeout` for the redirect.
    ///
    /// Returns `None` on expiry (status becomes [`CaptureStatus::TimedOut`])
    /// or if the response was already consumed by an earlier call.
    pub async fn wait_for_response(&mut self, timeout: Duration) -> Option<AuthorizationResponse> {
        let receiver = self.receiver.take()?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(_)) => {
                warn!("loopback listener dropped before a redirect arrived");
                None
            }
            Err(_) => {
                let mut session = self.session.lock();
                if session.status == CaptureStatus::Awaiting {
                    session.status = CaptureStatus::TimedOut;
                }
                info!(timeout_secs = timeout.as_secs(), "timed out waiting for redirect");
                None
            }
        }
    }

    /// Stop the listener and wait up to `join_timeout` for it to exit,
    /// aborting it otherwise. Calling this more than once is a no-op.
    pub async fn shutdown(&mut self, join_timeout: Duration) {
        self.cancel.cancel();

        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(join_timeout, &mut handle).await {
                Ok(Ok(())) => debug!(port = self.port, "loopback listener stopped"),
                Ok(Err(err)) => warn!(port = self.port, error = %err, "loopback listener task failed"),
                Err(_) => {
                    warn!(port = self.port, "loopback listener did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        self.session.lock().status = CaptureStatus::Closed;
    }
}

impl Drop for LoopbackCaptureServer {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
        self.session.lock().status = CaptureStatus::Closed;
    }
}

/// Bind `port` on `127.0.0.1`, then on `[::1]`.
///
/// `[::1]` already in use (or reserved) is contention and fails the port; a
/// host without IPv6 loopback keeps the IPv4 listener alone.
async fn bind_loopback(port: u16) -> io::Result<(TcpListener, Option<TcpListener>)> {
    let listener = TcpListener::bind((LOOPBACK_HOST, port)).await?;

    match TcpListener::bind((LOOPBACK_HOST_V6, port)).await {
        Ok(listener_v6) => Ok((listener, Some(listener_v6))),
        Err(e) if matches!(e.kind(), ErrorKind::AddrInUse | ErrorKind::PermissionDenied) => Err(e),
        Err(e) => {
            debug!(port, error = %e, "no IPv6 loopback, listening on IPv4 only");
            Ok((listener, None))
        }
    }
}

async fn capture_redirect(
    State(session): State<SharedSession>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let Some(response) = AuthorizationResponse::from_query_pairs(params) else {
        debug!("ignoring loopback request without code or error");
        return (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response();
    };

    let page = if response.is_error() { ERROR_PAGE } else { SUCCESS_PAGE };

    {
        let mut guard = session.lock();
        if guard.status == CaptureStatus::Awaiting {
            info!(error = response.is_error(), "authorization redirect captured");
            guard.status = CaptureStatus::Received;
            guard.captured = Some(response.clone());
            if let Some(notifier) = guard.notifier.take() {
                let _ = notifier.send(response);
            }
        } else {
            debug!(status = ?guard.status, "ignoring redirect after capture");
        }
    }

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store"), (header::CONNECTION, "close")],
        Html(page),
    )
        .into_response()
}
