//! Sealed session tokens.
//!
//! The user's vendor credentials never leave the server in cleartext. They are
//! serialized to JSON and sealed with AES-256-GCM; the resulting token is the
//! only session state and lives in an HTTP-only cookie. No server-side table
//! exists, so the derived key is the sole root of trust.
//!
//! Format:  base64( nonce(12) || tag(16) || ciphertext )
//!
//! The plaintext is JSON:
//! ```json
//! { "apiKey": "...", "refreshToken": "...", "baseUrl": "https://..." }
//! ```

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Error;

/// Minimum length, in characters, of the shared secret the key is derived from.
pub const MIN_SECRET_CHARS: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = NONCE_LEN + TAG_LEN;

/// Vendor credentials for one session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub api_key: String,
    pub refresh_token: String,
    /// Upstream base URL without a trailing slash. `None` means the
    /// configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("api_key", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Seals and opens [`CredentialRecord`]s under a key derived once at start-up.
pub struct CredentialCodec {
    cipher: Aes256Gcm,
}

impl CredentialCodec {
    /// Derive the 256-bit key from `secret` with SHA-256.
    ///
    /// Fails when the secret is shorter than [`MIN_SECRET_CHARS`]; callers are
    /// expected to abort start-up on that error.
    pub fn from_secret(secret: &str) -> Result<Self, String> {
        let chars = secret.chars().count();
        if chars < MIN_SECRET_CHARS {
            return Err(format!(
                "auth secret must be at least {MIN_SECRET_CHARS} characters (got {chars})"
            ));
        }
        let key = Sha256::digest(secret.as_bytes());
        Ok(Self {
            cipher: Aes256Gcm::new(&key),
        })
    }

    /// Seal a record into an opaque, cookie-safe token.
    ///
    /// Every call draws a fresh random nonce, so sealing the same record twice
    /// yields different tokens.
    pub fn encrypt(&self, record: &CredentialRecord) -> Result<String, Error> {
        let mut buffer = serde_json::to_vec(record)?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, b"", &mut buffer)
            .map_err(|_| Error::Encryption)?;

        let mut blob = Vec::with_capacity(HEADER_LEN + buffer.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&buffer);

        Ok(STANDARD.encode(&blob))
    }

    /// Open a token produced by [`CredentialCodec::encrypt`].
    ///
    /// A token that cannot be decoded or split yields [`Error::Format`]; one
    /// whose tag does not verify yields [`Error::Integrity`].
    pub fn decrypt(&self, token: &str) -> Result<CredentialRecord, Error> {
        let blob = STANDARD
            .decode(token.trim())
            .map_err(|e| Error::Format(format!("invalid encoding: {e}")))?;

        if blob.len() < HEADER_LEN {
            return Err(Error::Format(format!(
                "token too short ({} bytes)",
                blob.len()
            )));
        }

        let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
        let (tag_bytes, ciphertext) = rest.split_at(TAG_LEN);

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce_bytes),
                b"",
                &mut buffer,
                Tag::from_slice(tag_bytes),
            )
            .map_err(|_| Error::Integrity)?;

        serde_json::from_slice(&buffer).map_err(|e| Error::Format(format!("payload corrupt: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn codec() -> CredentialCodec {
        CredentialCodec::from_secret(SECRET).unwrap()
    }

    fn record() -> CredentialRecord {
        CredentialRecord {
            api_key: "sk_test".to_string(),
            refresh_token: "rt_test".to_string(),
            base_url: Some("https://developer.atomberg-iot.com".to_string()),
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let token = codec.encrypt(&record()).unwrap();
        assert_eq!(codec.decrypt(&token).unwrap(), record());

        let bare = CredentialRecord {
            base_url: None,
            ..record()
        };
        let token = codec.encrypt(&bare).unwrap();
        assert_eq!(codec.decrypt(&token).unwrap(), bare);
    }

    #[test]
    fn test_token_layout() {
        let token = codec().encrypt(&record()).unwrap();
        let blob = STANDARD.decode(&token).unwrap();
        let plaintext_len = serde_json::to_vec(&record()).unwrap().len();
        assert_eq!(blob.len(), NONCE_LEN + TAG_LEN + plaintext_len);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let codec = codec();
        let a = codec.encrypt(&record()).unwrap();
        let b = codec.encrypt(&record()).unwrap();
        assert_ne!(a, b);
        assert_ne!(
            STANDARD.decode(&a).unwrap()[..NONCE_LEN],
            STANDARD.decode(&b).unwrap()[..NONCE_LEN]
        );
    }

    #[test]
    fn test_any_flipped_byte_fails_integrity() {
        let codec = codec();
        let token = codec.encrypt(&record()).unwrap();
        let blob = STANDARD.decode(&token).unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let result = codec.decrypt(&STANDARD.encode(&tampered));
            assert!(
                matches!(result, Err(Error::Integrity)),
                "byte {i} flip was not detected"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = codec().encrypt(&record()).unwrap();
        let other = CredentialCodec::from_secret("ffffffffffffffffffffffffffffffff").unwrap();
        assert!(matches!(other.decrypt(&token), Err(Error::Integrity)));
    }

    #[test]
    fn test_garbage_input_is_format_error() {
        let codec = codec();
        assert!(matches!(codec.decrypt("not base64!!"), Err(Error::Format(_))));
        assert!(matches!(codec.decrypt(""), Err(Error::Format(_))));
        assert!(matches!(codec.decrypt("AAAA"), Err(Error::Format(_))));
    }

    #[test]
    fn test_secret_length_boundary() {
        let short = "a".repeat(MIN_SECRET_CHARS - 1);
        let exact = "a".repeat(MIN_SECRET_CHARS);
        assert!(CredentialCodec::from_secret(&short).is_err());
        assert!(CredentialCodec::from_secret(&exact).is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let shown = format!("{:?}", record());
        assert!(!shown.contains("sk_test"));
        assert!(!shown.contains("rt_test"));
        assert!(shown.contains("developer.atomberg-iot.com"));
    }

    #[test]
    fn test_wire_format_uses_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["apiKey"], "sk_test");
        assert_eq!(json["refreshToken"], "rt_test");
        assert!(json.get("api_key").is_none());
    }
}
