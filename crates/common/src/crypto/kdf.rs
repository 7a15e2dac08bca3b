//! Machine-bound key derivation.
//!
//! The token cache key is never stored. It is re-derived on every start from
//! the machine identity and the application name with PBKDF2-HMAC-SHA256,
//! so a cache file copied to another machine cannot be opened.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

/// PBKDF2 iteration count for cache keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Length of a freshly generated per-install salt.
pub const SALT_LEN: usize = 16;

/// Derive the 256-bit cache key from `machine_id ++ app_name`.
///
/// # Errors
/// Returns `CommonError::Crypto` if either input is empty or the salt is
/// shorter than 8 bytes.
pub fn derive_machine_key(
    machine_id: &str,
    app_name: &str,
    salt: &[u8],
) -> CommonResult<Zeroizing<Vec<u8>>> {
    if machine_id.is_empty() || app_name.is_empty() {
        return Err(CommonError::crypto_op("derive_key", "machine id and app name are required"));
    }
    if salt.len() < 8 {
        return Err(CommonError::crypto_op("derive_key", "salt must be at least 8 bytes"));
    }

    let password = Zeroizing::new(format!("{machine_id}{app_name}"));
    let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    Ok(key)
}

/// Generate a random per-install salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
