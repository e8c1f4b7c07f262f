//! Cryptographic helpers for the server.
//!
//! - HMAC-SHA256 JWT signing/verification (bearer tokens)
//! - XChaCha20-Poly1305 sealing for stored IRZ+ passwords
//!
//! Pure Rust crates throughout; no system crypto libraries.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ServiceError;

// ── JWT (HMAC-SHA256) ───────────────────────────────────────────────────────

/// JWT header (always HS256).
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Default bearer token lifetime: 30 days. There is no refresh flow, so
/// tokens live long enough to span a season of farm work.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;

/// Sign a bearer token for the given user. Returns the encoded JWT string.
pub fn sign_token(user_id: &str, secret: &str, now_unix: u64, ttl_secs: u64) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes());

    let payload = format!(
        r#"{{"sub":"{}","iat":{},"exp":{}}}"#,
        user_id,
        now_unix,
        now_unix + ttl_secs,
    );
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

    format!("{signing_input}.{sig_b64}")
}

/// Verify a bearer token and return the `sub` (user id) if valid.
pub fn verify_token(token: &str, secret: &str, now_unix: u64) -> Result<String, ServiceError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ServiceError::Unauthorized("invalid token format".into()));
    }

    // Verify signature
    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let expected_sig = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let actual_sig = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| ServiceError::Unauthorized("invalid token signature encoding".into()))?;

    if expected_sig.len() != actual_sig.len()
        || !expected_sig
            .iter()
            .zip(actual_sig.iter())
            .all(|(a, b)| a == b)
    {
        return Err(ServiceError::Unauthorized("invalid token signature".into()));
    }

    // Decode payload
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| ServiceError::Unauthorized("invalid token payload encoding".into()))?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|_| ServiceError::Unauthorized("invalid token payload".into()))?;

    // Check expiry
    let exp = payload["exp"]
        .as_u64()
        .ok_or_else(|| ServiceError::Unauthorized("missing exp claim".into()))?;
    if now_unix > exp {
        return Err(ServiceError::Unauthorized("token expired".into()));
    }

    // Extract sub
    let sub = payload["sub"]
        .as_str()
        .ok_or_else(|| ServiceError::Unauthorized("missing sub claim".into()))?
        .to_string();

    Ok(sub)
}

// ── Credential sealing (XChaCha20-Poly1305) ─────────────────────────────────

pub const SEAL_KEY_LEN: usize = 32;
const SEAL_NONCE_LEN: usize = 24;

/// Parse the 64-hex-char sealing key from configuration.
pub fn parse_seal_key(hex_key: &str) -> Result<[u8; SEAL_KEY_LEN], ServiceError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|_| ServiceError::Internal("sealing key is not valid hex".into()))?;
    let arr: [u8; SEAL_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| ServiceError::Internal("sealing key must be 32 bytes (64 hex chars)".into()))?;
    Ok(arr)
}

/// Seal a secret for storage. Output is base64 of `nonce || ciphertext`;
/// the nonce is random per call, so sealing the same secret twice yields
/// different blobs.
pub fn seal(key: &[u8; SEAL_KEY_LEN], plaintext: &str) -> Result<String, ServiceError> {
    let mut nonce = [0u8; SEAL_NONCE_LEN];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;

    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| ServiceError::Internal("sealing failure".into()))?;

    let mut blob = Vec::with_capacity(SEAL_NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(blob))
}

/// Open a sealed secret. Fails on truncation, tampering, or a wrong key.
pub fn open_sealed(key: &[u8; SEAL_KEY_LEN], sealed: &str) -> Result<String, ServiceError> {
    let blob = URL_SAFE_NO_PAD
        .decode(sealed)
        .map_err(|_| ServiceError::Internal("sealed credential is not valid base64".into()))?;
    if blob.len() <= SEAL_NONCE_LEN {
        return Err(ServiceError::Internal("sealed credential truncated".into()));
    }

    let (nonce, ciphertext) = blob.split_at(SEAL_NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.into());
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| ServiceError::Internal("sealed credential failed authentication".into()))?;

    String::from_utf8(plaintext)
        .map_err(|_| ServiceError::Internal("sealed credential is not UTF-8".into()))
}

// ── Internal ────────────────────────────────────────────────────────────────

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let token = sign_token("user-1", SECRET, 1_700_000_000, 3600);
        let sub = verify_token(&token, SECRET, 1_700_000_100).unwrap();
        assert_eq!(sub, "user-1");
    }

    #[test]
    fn expired_token_rejected() {
        let token = sign_token("user-1", SECRET, 1_700_000_000, 3600);
        let err = verify_token(&token, SECRET, 1_700_003_601).unwrap_err();
        assert_eq!(err, ServiceError::Unauthorized("token expired".into()));
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = sign_token("user-1", SECRET, 1_700_000_000, 3600);
        assert!(verify_token(&token, "other-secret", 1_700_000_100).is_err());
    }

    #[test]
    fn mangled_tokens_rejected() {
        assert!(verify_token("not-a-jwt", SECRET, 0).is_err());
        assert!(verify_token("a.b", SECRET, 0).is_err());
        let token = sign_token("user-1", SECRET, 1_700_000_000, 3600);
        let mangled = format!("{}x", token);
        assert!(verify_token(&mangled, SECRET, 1_700_000_100).is_err());
    }

    #[test]
    fn seal_round_trip() {
        let key = [7u8; 32];
        let sealed = seal(&key, "tajne-haslo").unwrap();
        assert_eq!(open_sealed(&key, &sealed).unwrap(), "tajne-haslo");
        // random nonce: two seals of the same secret differ
        assert_ne!(sealed, seal(&key, "tajne-haslo").unwrap());
    }

    #[test]
    fn tampered_blob_fails_authentication() {
        let key = [7u8; 32];
        let sealed = seal(&key, "tajne-haslo").unwrap();
        let mut blob = URL_SAFE_NO_PAD.decode(&sealed).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(blob);
        assert!(open_sealed(&key, &tampered).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&[7u8; 32], "secret").unwrap();
        assert!(open_sealed(&[8u8; 32], &sealed).is_err());
    }

    #[test]
    fn seal_key_parsing() {
        let hex_key = "00".repeat(32);
        assert!(parse_seal_key(&hex_key).is_ok());
        assert!(parse_seal_key("zz").is_err());
        assert!(parse_seal_key("0011").is_err());
    }
}
