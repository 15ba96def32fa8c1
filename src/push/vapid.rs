//! VAPID sender identity for Web Push (RFC 8292).
//!
//! The private key is the raw 32-byte P-256 scalar and the public key the
//! 65-byte uncompressed SEC1 point, both base64url without padding. This is
//! the format `web_push::VapidSignatureBuilder::from_base64` expects and the
//! one the `web-push generate-vapid-keys` tooling prints.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use thiserror::Error;

use crate::config::VapidConfig;

/// Attempts at drawing a valid scalar before giving up
const MAX_KEYGEN_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum VapidError {
    #[error("VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must both be set")]
    Missing,

    #[error("Invalid VAPID {which} key: {reason}")]
    Invalid { which: &'static str, reason: String },

    #[error("VAPID public key does not belong to the configured private key")]
    Mismatch,

    #[error("Failed to generate a VAPID key pair")]
    Generation,
}

/// A validated VAPID key pair
#[derive(Clone)]
pub struct VapidKeys {
    private_key_b64: String,
    public_key_b64: String,
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key_b64)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl VapidKeys {
    /// Generate a fresh key pair.
    pub fn generate() -> Result<Self, VapidError> {
        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let candidate: [u8; 32] = rand::random();
            if let Ok(signing_key) = SigningKey::from_bytes(candidate.as_slice().into()) {
                return Ok(Self::from_signing_key(&signing_key));
            }
        }
        Err(VapidError::Generation)
    }

    /// Load the configured key pair, failing if either half is absent or malformed.
    pub fn from_config(config: &VapidConfig) -> Result<Self, VapidError> {
        match (config.public_key.as_deref(), config.private_key.as_deref()) {
            (Some(public), Some(private)) => Self::from_base64url(public, private),
            _ => Err(VapidError::Missing),
        }
    }

    /// Validate base64url-encoded keys and check they form a pair.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self, VapidError> {
        let public_key_b64 = public_key_b64.trim();
        let private_key_b64 = private_key_b64.trim();

        let pub_bytes = BASE64URL
            .decode(public_key_b64)
            .map_err(|e| VapidError::Invalid {
                which: "public",
                reason: e.to_string(),
            })?;
        if pub_bytes.len() != 65 || pub_bytes[0] != 0x04 {
            return Err(VapidError::Invalid {
                which: "public",
                reason: format!(
                    "expected 65-byte uncompressed P-256 point, got {} bytes",
                    pub_bytes.len()
                ),
            });
        }

        let priv_bytes = BASE64URL
            .decode(private_key_b64)
            .map_err(|e| VapidError::Invalid {
                which: "private",
                reason: e.to_string(),
            })?;
        if priv_bytes.len() != 32 {
            return Err(VapidError::Invalid {
                which: "private",
                reason: format!("expected 32-byte P-256 scalar, got {} bytes", priv_bytes.len()),
            });
        }
        let signing_key =
            SigningKey::from_bytes(priv_bytes.as_slice().into()).map_err(|_| VapidError::Invalid {
                which: "private",
                reason: "not a valid P-256 scalar".to_string(),
            })?;

        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err(VapidError::Mismatch);
        }

        Ok(Self {
            private_key_b64: private_key_b64.to_string(),
            public_key_b64: public_key_b64.to_string(),
        })
    }

    fn from_signing_key(signing_key: &SigningKey) -> Self {
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);
        Self {
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        }
    }

    /// Base64url public key, served to browsers as `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_vapid_keys() {
        let keys = VapidKeys::generate().expect("should generate keys");

        let pub_bytes = BASE64URL.decode(keys.public_key_base64url()).unwrap();
        assert_eq!(pub_bytes.len(), 65);
        assert_eq!(pub_bytes[0], 0x04);

        let priv_bytes = BASE64URL.decode(keys.private_key_base64url()).unwrap();
        assert_eq!(priv_bytes.len(), 32);
    }

    #[test]
    fn test_generated_keys_validate() {
        let keys = VapidKeys::generate().unwrap();
        let loaded =
            VapidKeys::from_base64url(keys.public_key_base64url(), keys.private_key_base64url())
                .expect("generated keys should validate");
        assert_eq!(loaded.public_key_base64url(), keys.public_key_base64url());
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let a = VapidKeys::generate().unwrap();
        let b = VapidKeys::generate().unwrap();
        let err = VapidKeys::from_base64url(a.public_key_base64url(), b.private_key_base64url())
            .unwrap_err();
        assert!(matches!(err, VapidError::Mismatch));
    }

    #[test]
    fn test_from_config_requires_both_keys() {
        let keys = VapidKeys::generate().unwrap();
        let config = VapidConfig {
            public_key: Some(keys.public_key_base64url().to_string()),
            private_key: None,
            subject: "mailto:ops@example.com".to_string(),
        };
        assert!(matches!(VapidKeys::from_config(&config), Err(VapidError::Missing)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(VapidKeys::from_base64url("not-valid-key", "also-bad").is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let keys = VapidKeys::generate().unwrap();
        let debug = format!("{:?}", keys);
        assert!(!debug.contains(keys.private_key_base64url()));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_keys_work_with_web_push_signature_builder() {
        use web_push::{SubscriptionInfo, VapidSignatureBuilder};

        let keys = VapidKeys::generate().unwrap();
        let sub = SubscriptionInfo::new(
            "https://push.example.com/test",
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "AAAAAAAAAAAAAAAAAAAAAA",
        );
        tokio_test::assert_ok!(VapidSignatureBuilder::from_base64(
            keys.private_key_base64url(),
            &sub
        ));
    }
}
