//! PKCE (Proof Key for Code Exchange) for public desktop clients
//!
//! Implements RFC 7636 with the `S256` method, plus the anti-forgery `state`
//! value carried through the browser redirect.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind verifiers and state values (43 chars once
/// base64url-encoded, inside RFC 7636's 43-128 window).
const RANDOM_BYTES: usize = 32;

fn random_url_token() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier
#[must_use]
pub fn generate_code_verifier() -> String {
    random_url_token()
}

/// `BASE64URL(SHA256(ASCII(code_verifier)))`, unpadded
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    random_url_token()
}

/// Compare the state sent with the authorization request against the one
/// returned on the redirect.
///
/// Runs in time independent of where the inputs first differ.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifier, challenge and state for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Kept secret until token exchange
    pub code_verifier: String,

    /// Sent in the authorization request
    pub code_challenge: String,

    /// Must round-trip unchanged through the redirect
    pub state: String,
}

impl PkceChallenge {
    /// Generate a fresh challenge.
    ///
    /// # Examples
    /// ```
    /// use deskauth_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 43);
    /// assert_eq!(challenge.challenge_method(), "S256");
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
