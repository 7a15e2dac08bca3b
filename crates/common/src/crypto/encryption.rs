//! AES-256-GCM sealing for small records.
//!
//! - [`EncryptionService`]: AES-256-GCM encryption/decryption under a single
//!   32-byte key
//! - [`EncryptedData`]: serializable nonce + ciphertext container
//!
//! The ciphertext carries the GCM authentication tag, so any bit flip,
//! truncation or wrong key surfaces as a decryption error rather than as
//! garbage plaintext.
//!
//! ## Usage
//!
//! ```rust
//! use deskauth_common::crypto::encryption::EncryptionService;
//! use deskauth_common::crypto::{derive_machine_key, generate_salt};
//!
//! let key = derive_machine_key("machine-id", "MyApp", &generate_salt())?;
//! let service = EncryptionService::new(key)?;
//!
//! let sealed = service.encrypt_to_string(b"sensitive data")?;
//! let opened = service.decrypt_from_string(&sealed)?;
//! assert_eq!(opened, b"sensitive data");
//! # Ok::<(), deskauth_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

const ALGORITHM: &str = "AES-256-GCM";
const NONCE_LEN: usize = 12;

/// Encrypted record as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// 96-bit AES-GCM nonce, fresh per record
    pub nonce: Vec<u8>,
    /// Ciphertext followed by the 16-byte authentication tag
    pub ciphertext: Vec<u8>,
    /// Algorithm label, `AES-256-GCM`
    pub algorithm: String,
}

/// AES-GCM encryption service bound to one key.
pub struct EncryptionService {
    key: Zeroizing<Vec<u8>>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.key_fingerprint())
            .finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    ///
    /// # Errors
    /// Returns `CommonError::Crypto` if the key is not exactly 32 bytes.
    pub fn new(key: impl Into<Zeroizing<Vec<u8>>>) -> CommonResult<Self> {
        let key = key.into();
        if key.len() != 32 {
            return Err(CommonError::crypto_op("init", "Encryption key must be exactly 32 bytes"));
        }

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| {
            CommonError::crypto_op("init", format!("Failed to create encryption cipher: {e}"))
        })?;

        Ok(Self { key, cipher })
    }

    /// Encrypt bytes into an `EncryptedData` payload.
    ///
    /// # Errors
    /// Returns `CommonError::Crypto` if sealing fails.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::crypto_op("encrypt", format!("Encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    ///
    /// # Errors
    /// Returns `CommonError::Crypto` on an unknown algorithm, a malformed
    /// nonce, or a failed authentication tag check.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::crypto_op(
                "decrypt",
                format!("Unsupported algorithm: {}", encrypted.algorithm),
            ));
        }

        let nonce_array: [u8; NONCE_LEN] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::crypto_op("decrypt", "Nonce must be exactly 12 bytes for AES-256-GCM")
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::crypto_op("decrypt", format!("Decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string.
    ///
    /// # Errors
    /// See [`EncryptionService::encrypt`].
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    ///
    /// # Errors
    /// Returns `CommonError::Serialization` for an undecodable envelope and
    /// `CommonError::Crypto` when the payload does not authenticate.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str.trim())
            .map_err(|e| CommonError::serialization_format("base64", e.to_string()))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    /// Generate a short fingerprint for the current key.
    pub fn key_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_slice());
        let result = hasher.finalize();
        BASE64.encode(&result[..8])
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}
