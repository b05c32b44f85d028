use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// One authorization attempt's PKCE material.
///
/// `code_verifier` and `state` must be persisted before redirecting and are
/// consumed by exactly one callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Handshake {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

/// Generates a fresh verifier, its S256 challenge and an independent state nonce.
#[must_use]
pub fn generate_handshake() -> Handshake {
    let code_verifier = generate_code_verifier();
    let code_challenge = generate_code_challenge(&code_verifier);
    Handshake {
        code_verifier,
        code_challenge,
        state: generate_state(),
    }
}

/// Generates a cryptographically random code verifier for PKCE.
///
/// Returns a 64-character URL-safe string (RFC 7636 compliant, 43-128 chars).
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Computes the S256 code challenge from a code verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates the anti-CSRF `state` parameter.
///
/// 22 URL-safe characters (16 random bytes).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
