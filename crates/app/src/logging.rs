//! Subscriber setup and command outcome logging.

use std::time::Duration;

use deskauth_domain::AuthError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Filter used when neither `DESKAUTH_LOG` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, writing to stderr so stdout stays free
/// for command output.
///
/// `DESKAUTH_LOG` (falling back to `RUST_LOG`) holds the filter;
/// `DESKAUTH_LOG_FORMAT=json` switches to JSON lines.
pub fn init() {
    let filter = std::env::var("DESKAUTH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(|_| EnvFilter::new(DEFAULT_FILTER), EnvFilter::new);

    let json = std::env::var("DESKAUTH_LOG_FORMAT").is_ok_and(|format| format == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded; keep that one.
    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}

/// Log the outcome of a command with structured fields.
///
/// Only the error label and message are recorded, never token material.
pub fn log_command_outcome(command: &str, elapsed: Duration, error: Option<&AuthError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_succeeded"),
        Some(err) => warn!(command, duration_ms, kind = err.label(), error = %err, "command_failed"),
    }
}
