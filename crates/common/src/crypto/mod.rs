//! Cryptographic primitives for the token cache.

pub mod encryption;
pub mod kdf;

pub use encryption::{EncryptedData, EncryptionService};
pub use kdf::{derive_machine_key, generate_salt, PBKDF2_ITERATIONS};
