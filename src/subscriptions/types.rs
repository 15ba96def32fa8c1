//! Push subscription and registry entry types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A browser push subscription as produced by `PushManager.subscribe()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    /// Push service endpoint URL, the natural key of a subscription
    pub endpoint: String,
    /// Key material for RFC 8291 payload encryption
    pub keys: SubscriptionKeys,
    /// Browser-reported expiry; accepted and carried but not acted upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client P-256 ECDH public key (base64url)
    pub p256dh: String,
    /// Shared authentication secret (base64url)
    pub auth: String,
}

impl PushSubscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
            expiration_time: None,
        }
    }

    /// Check that every field needed for delivery is present
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Subscription endpoint is required".to_string());
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err("Subscription keys.p256dh and keys.auth are required".to_string());
        }
        Ok(())
    }

    /// Endpoint-only view that never carries key material
    pub fn summary(&self) -> SubscriptionSummary {
        SubscriptionSummary {
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Redacted subscription view for external listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSummary {
    pub endpoint: String,
}

/// A registry entry wrapping one stored subscription
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    pub id: Uuid,
    /// Insertion sequence, used to keep listings in subscribe order
    pub seq: u64,
    pub subscription: PushSubscription,
}

impl SubscriptionHandle {
    pub fn new(seq: u64, subscription: PushSubscription) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            subscription,
        }
    }

    /// Same entry and position, fresh key material
    pub fn with_subscription(&self, subscription: PushSubscription) -> Self {
        Self {
            id: self.id,
            seq: self.seq,
            subscription,
        }
    }
}

/// Result of adding a subscription to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry was appended
    Inserted,
    /// An entry with the same endpoint already existed; its keys were replaced
    Replaced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_browser_subscription() {
        let json = r#"{
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": { "p256dh": "BNc...", "auth": "tBH..." }
        }"#;

        let sub: PushSubscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.endpoint, "https://fcm.googleapis.com/fcm/send/abc");
        assert_eq!(sub.keys.p256dh, "BNc...");
        assert_eq!(sub.keys.auth, "tBH...");
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(PushSubscription::new("", "p", "a").validate().is_err());
        assert!(PushSubscription::new("https://push.example.com/1", "", "a")
            .validate()
            .is_err());
        assert!(PushSubscription::new("https://push.example.com/1", "p", " ")
            .validate()
            .is_err());
    }

    #[test]
    fn test_summary_has_no_key_material() {
        let sub = PushSubscription::new("https://push.example.com/1", "secret-p256dh", "secret-auth");
        let json = serde_json::to_string(&sub.summary()).unwrap();
        assert_eq!(json, r#"{"endpoint":"https://push.example.com/1"}"#);
    }
}
