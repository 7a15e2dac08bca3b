//! Encrypted on-disk token cache.
//!
//! One record per application, stored as `token_cache.dat` in the
//! application's local config directory. The record is the JSON
//! [`TokenSet`] sealed with AES-256-GCM under a key derived from the machine
//! identity, the application name and a per-install salt
//! (`token_cache.salt`).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use deskauth_common::auth::{TokenSet, TokenStoreTrait};
use deskauth_common::crypto::kdf::SALT_LEN;
use deskauth_common::crypto::{derive_machine_key, generate_salt};
use deskauth_common::error::ErrorClassification;
use deskauth_common::{CommonError, CommonResult, EncryptionService};
use deskauth_domain::constants::{TOKEN_CACHE_FILE, TOKEN_CACHE_SALT_FILE};
use deskauth_domain::{AuthError, Result};
use tracing::{debug, info, warn};

/// Resolve (and create) the cache directory for `app_name`.
///
/// `%LOCALAPPDATA%\{app_name}` on Windows, `~/.config/{app_name}` on Linux,
/// `~/Library/Application Support/{app_name}` on macOS.
///
/// # Errors
/// Returns `AuthError::Persistence` if the platform has no local config
/// directory or the directory cannot be created.
pub fn resolve_cache_dir(app_name: &str) -> Result<PathBuf> {
    let base = dirs::config_local_dir().ok_or_else(|| {
        AuthError::Persistence("no local configuration directory on this platform".to_string())
    })?;
    let dir = base.join(app_name);
    fs::create_dir_all(&dir).map_err(|e| {
        AuthError::Persistence(format!("failed to create {}: {e}", dir.display()))
    })?;
    Ok(dir)
}

/// Encrypted single-record token cache.
pub struct SecureTokenStore {
    cache_path: PathBuf,
    service: EncryptionService,
    app_name: String,
}

impl std::fmt::Debug for SecureTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenStore")
            .field("cache_path", &self.cache_path)
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl SecureTokenStore {
    /// Open the store in the default cache directory for `app_name`.
    ///
    /// # Errors
    /// See [`resolve_cache_dir`] and [`SecureTokenStore::open_in`].
    pub fn open(app_name: &str, machine_id: &str) -> Result<Self> {
        let dir = resolve_cache_dir(app_name)?;
        Self::open_in(dir, app_name, machine_id)
    }

    /// Open the store in `dir`, creating the directory and the per-install
    /// salt if they do not exist yet.
    ///
    /// # Errors
    /// Returns `AuthError::Persistence` if the directory or salt cannot be
    /// prepared, and `AuthError::Internal` if key derivation fails.
    pub fn open_in(dir: impl Into<PathBuf>, app_name: &str, machine_id: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            AuthError::Persistence(format!("failed to create {}: {e}", dir.display()))
        })?;

        let salt = load_or_create_salt(&dir.join(TOKEN_CACHE_SALT_FILE))
            .map_err(|e| AuthError::Persistence(e.to_string()))?;
        let key = derive_machine_key(machine_id, app_name, &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let service = EncryptionService::new(key).map_err(|e| AuthError::Internal(e.to_string()))?;

        debug!(dir = %dir.display(), key = %service.key_fingerprint(), "token cache opened");

        Ok(Self {
            cache_path: dir.join(TOKEN_CACHE_FILE),
            service,
            app_name: app_name.to_string(),
        })
    }

    /// Path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Whether a cache file is present. Says nothing about readability.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.cache_path.is_file()
    }

    /// Seal and write `tokens`, replacing any previous record atomically.
    ///
    /// # Errors
    /// Returns `CommonError::Serialization`, `CommonError::Crypto` or
    /// `CommonError::Persistence` depending on the failing step.
    pub fn save(&self, tokens: &TokenSet) -> CommonResult<()> {
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(tokens)?);
        let envelope = self.service.encrypt_to_string(&plaintext)?;
        write_atomically(&self.cache_path, envelope.as_bytes())
            .map_err(|e| CommonError::persistence_op("save", e.to_string()))?;

        debug!(path = %self.cache_path.display(), "token cache written");
        Ok(())
    }

    /// Read the cached record.
    ///
    /// Any failure (unreadable file, foreign key, tampering, bad JSON) is
    /// treated as a cache miss and the file is removed.
    #[must_use]
    pub fn load(&self) -> Option<TokenSet> {
        let envelope = match fs::read_to_string(&self.cache_path) {
            Ok(envelope) => envelope,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, "token cache unreadable, discarding");
                self.discard();
                return None;
            }
        };

        let plaintext = match self.service.decrypt_from_string(&envelope) {
            Ok(plaintext) => zeroize::Zeroizing::new(plaintext),
            Err(err) => {
                warn!(
                    error_type = err.error_type_name(),
                    severity = %err.severity(),
                    "token cache could not be decrypted, discarding"
                );
                self.discard();
                return None;
            }
        };

        match serde_json::from_slice::<TokenSet>(&plaintext) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!(error = %e, "token cache record is malformed, discarding");
                self.discard();
                None
            }
        }
    }

    /// Remove the cache file. A missing file is not an error.
    ///
    /// # Errors
    /// Returns `CommonError::Persistence` if the file exists but cannot be
    /// removed.
    pub fn delete(&self) -> CommonResult<()> {
        match fs::remove_file(&self.cache_path) {
            Ok(()) => {
                info!(path = %self.cache_path.display(), "token cache deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CommonError::persistence_op("delete", e.to_string())),
        }
    }

    fn discard(&self) {
        if let Err(e) = self.delete() {
            warn!(error = %e, "failed to remove unusable token cache");
        }
    }
}

impl TokenStoreTrait for SecureTokenStore {
    fn save(&self, tokens: &TokenSet) -> CommonResult<()> {
        Self::save(self, tokens)
    }

    fn load(&self) -> Option<TokenSet> {
        Self::load(self)
    }

    fn delete(&self) -> CommonResult<()> {
        Self::delete(self)
    }
}

/// Read the per-install salt, generating it on first use.
///
/// A salt file of the wrong length is replaced; caches sealed under it become
/// unreadable and are discarded on the next load.
fn load_or_create_salt(path: &Path) -> CommonResult<Vec<u8>> {
    match fs::read(path) {
        Ok(salt) if salt.len() == SALT_LEN => return Ok(salt),
        Ok(_) => warn!(path = %path.display(), "salt file has unexpected length, regenerating"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "creating per-install salt");
        }
        Err(e) => return Err(CommonError::persistence_op("read_salt", e.to_string())),
    }

    let salt = generate_salt();
    write_atomically(path, &salt)
        .map_err(|e| CommonError::persistence_op("write_salt", e.to_string()))?;
    Ok(salt.to_vec())
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
