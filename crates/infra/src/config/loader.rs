//! Configuration loader
//!
//! Loads [`AuthConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DESKAUTH_CLIENT_ID`: Application (client) ID of the public client
//! - `DESKAUTH_APP_NAME`: Application name (cache directory, key material)
//! - `DESKAUTH_TENANT` / `DESKAUTH_POLICY`: B2C tenant and user flow
//! - `DESKAUTH_AUTHORITY`: Full authority URL, replaces tenant + policy
//! - `DESKAUTH_REDIRECT_PORT`: First loopback port to try
//! - `DESKAUTH_PORT_ATTEMPTS`: Number of consecutive ports to try
//! - `DESKAUTH_INTERACTION_TIMEOUT`: Seconds to wait for the browser
//! - `DESKAUTH_HTTP_TIMEOUT`: Seconds per token endpoint request
//! - `DESKAUTH_REFRESH_THRESHOLD`: Refresh tokens this many seconds early
//! - `DESKAUTH_SCOPES`: Space or comma separated default scopes
//! - `DESKAUTH_CACHE_DIR`: Override for the token cache directory
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./deskauth.{json,toml}` or `./config.{json,toml}` (working directory)
//! 2. `../config.{json,toml}` and `../../config.{json,toml}`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use deskauth_domain::{AuthConfig, AuthError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AuthError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<AuthConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `DESKAUTH_CLIENT_ID` and `DESKAUTH_APP_NAME` are required, together with
/// either `DESKAUTH_AUTHORITY` or both `DESKAUTH_TENANT` and
/// `DESKAUTH_POLICY`. Everything else falls back to its default.
///
/// # Errors
/// Returns `AuthError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<AuthConfig> {
    let client_id = env_var("DESKAUTH_CLIENT_ID")?;
    let app_name = env_var("DESKAUTH_APP_NAME")?;

    let authority = std::env::var("DESKAUTH_AUTHORITY").ok().filter(|s| !s.trim().is_empty());
    let (tenant, policy) = if authority.is_some() {
        (
            std::env::var("DESKAUTH_TENANT").unwrap_or_default(),
            std::env::var("DESKAUTH_POLICY").unwrap_or_default(),
        )
    } else {
        (env_var("DESKAUTH_TENANT")?, env_var("DESKAUTH_POLICY")?)
    };

    let mut config = AuthConfig::b2c(client_id, tenant, policy, app_name);
    config.authority = authority;

    if let Some(port) = env_parse("DESKAUTH_REDIRECT_PORT")? {
        config.redirect_base_port = port;
    }
    if let Some(attempts) = env_parse("DESKAUTH_PORT_ATTEMPTS")? {
        config.port_attempts = attempts;
    }
    if let Some(secs) = env_parse("DESKAUTH_INTERACTION_TIMEOUT")? {
        config.interaction_timeout_secs = secs;
    }
    if let Some(secs) = env_parse("DESKAUTH_HTTP_TIMEOUT")? {
        config.http_timeout_secs = secs;
    }
    if let Some(secs) = env_parse("DESKAUTH_REFRESH_THRESHOLD")? {
        config.refresh_threshold_secs = secs;
    }
    if let Ok(scopes) = std::env::var("DESKAUTH_SCOPES") {
        let parsed = split_scopes(&scopes);
        if !parsed.is_empty() {
            config.default_scopes = parsed;
        }
    }
    if let Ok(dir) = std::env::var("DESKAUTH_CACHE_DIR") {
        if !dir.trim().is_empty() {
            config.cache_dir = Some(PathBuf::from(dir));
        }
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AuthError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("deskauth.json"),
        dir.join("deskauth.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `AuthError::Config` if the variable is unset or blank.
fn env_var(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::Config(format!("Missing required environment variable: {key}"))),
    }
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `AuthError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AuthError::Config(format!("Invalid value for {key}: {e}"))),
        _ => Ok(None),
    }
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 13] = [
        "DESKAUTH_CLIENT_ID",
        "DESKAUTH_APP_NAME",
        "DESKAUTH_TENANT",
        "DESKAUTH_POLICY",
        "DESKAUTH_AUTHORITY",
        "DESKAUTH_REDIRECT_PORT",
        "DESKAUTH_PORT_ATTEMPTS",
        "DESKAUTH_INTERACTION_TIMEOUT",
        "DESKAUTH_HTTP_TIMEOUT",
        "DESKAUTH_REFRESH_THRESHOLD",
        "DESKAUTH_SCOPES",
        "DESKAUTH_CACHE_DIR",
        "DESKAUTH_UNUSED",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_split_scopes() {
        assert_eq!(
            split_scopes("openid, offline_access  https://contoso/api/read"),
            vec!["openid", "offline_access", "https://contoso/api/read"]
        );
        assert!(split_scopes(" , ").is_empty());
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_TENANT", "contoso");
        std::env::set_var("DESKAUTH_POLICY", "B2C_1_signin");
        std::env::set_var("DESKAUTH_REDIRECT_PORT", "9100");
        std::env::set_var("DESKAUTH_PORT_ATTEMPTS", "5");
        std::env::set_var("DESKAUTH_INTERACTION_TIMEOUT", "60");
        std::env::set_var("DESKAUTH_SCOPES", "openid offline_access");
        std::env::set_var("DESKAUTH_CACHE_DIR", "/tmp/deskauth-cache");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config should load from env vars");
        assert_eq!(config.client_id, "client-123");
        assert_eq!(config.redirect_base_port, 9100);
        assert_eq!(config.port_attempts, 5);
        assert_eq!(config.interaction_timeout_secs, 60);
        assert_eq!(config.default_scopes, vec!["openid", "offline_access"]);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/deskauth-cache")));
        assert_eq!(
            config.authority().unwrap(),
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signin"
        );
    }

    #[test]
    fn test_load_from_env_authority_override() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_AUTHORITY", "https://login.contoso.com/tfp/tenant/B2C_1_x/");

        let result = load_from_env();
        clear_env();

        let config = result.expect("authority alone should be enough");
        assert_eq!(
            config.token_endpoint().unwrap(),
            "https://login.contoso.com/tfp/tenant/B2C_1_x/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_TENANT", "contoso");

        let result = load_from_env();
        clear_env();

        let err = result.expect_err("missing policy should fail");
        assert!(matches!(err, AuthError::Config(ref msg) if msg.contains("DESKAUTH_POLICY")));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_TENANT", "contoso");
        std::env::set_var("DESKAUTH_POLICY", "B2C_1_signin");
        std::env::set_var("DESKAUTH_REDIRECT_PORT", "not-a-port");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(AuthError::Config(ref msg)) if msg.contains("REDIRECT_PORT")));
    }

    #[test]
    fn test_load_from_env_rejects_zero_attempts() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_TENANT", "contoso");
        std::env::set_var("DESKAUTH_POLICY", "B2C_1_signin");
        std::env::set_var("DESKAUTH_PORT_ATTEMPTS", "0");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_load_from_env_rejects_oversized_refresh_threshold() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DESKAUTH_CLIENT_ID", "client-123");
        std::env::set_var("DESKAUTH_APP_NAME", "DeskAuthTest");
        std::env::set_var("DESKAUTH_TENANT", "contoso");
        std::env::set_var("DESKAUTH_POLICY", "B2C_1_signin");
        std::env::set_var("DESKAUTH_REFRESH_THRESHOLD", i64::MAX.to_string());

        let result = load_from_env();
        clear_env();

        let err = result.expect_err("oversized threshold should fail validation");
        assert!(matches!(err, AuthError::Config(ref msg) if msg.contains("refresh_threshold")));
    }

    #[test]
    fn test_load_from_file_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deskauth.json");
        std::fs::write(
            &path,
            r#"{
                "client_id": "json-client",
                "tenant": "contoso",
                "policy": "B2C_1_signin",
                "app_name": "JsonApp",
                "port_attempts": 4
            }"#,
        )
        .unwrap();

        let config = load_from_file(Some(path)).expect("JSON config should load");
        assert_eq!(config.client_id, "json-client");
        assert_eq!(config.port_attempts, 4);
        assert_eq!(config.redirect_base_port, 8000);
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_from_file(Some(path)).expect_err("invalid JSON should fail");
        assert!(matches!(err, AuthError::Config(ref msg) if msg.contains("JSON")));
    }

    #[test]
    fn test_load_from_file_missing_path() {
        let err = load_from_file(Some(PathBuf::from("/definitely/missing/deskauth.toml")))
            .expect_err("missing file should fail");
        assert!(matches!(err, AuthError::Config(ref msg) if msg.contains("not found")));
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let err = parse_config("client_id: x", Path::new("deskauth.yaml")).unwrap_err();
        assert!(matches!(err, AuthError::Config(ref msg) if msg.contains("yaml")));
    }
}
