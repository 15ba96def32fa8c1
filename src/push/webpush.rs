use async_trait::async_trait;
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use crate::config::{PushConfig, VapidConfig};
use crate::subscriptions::PushSubscription;

use super::transport::{PushError, PushTransport};
use super::vapid::VapidKeys;

/// Web Push transport: RFC 8291 encryption and VAPID signing via `web-push`,
/// HTTP delivery via a shared `reqwest::Client`.
pub struct WebPushTransport {
    client: reqwest::Client,
    keys: Option<VapidKeys>,
    subject: String,
    ttl_seconds: u32,
}

impl WebPushTransport {
    pub fn new(keys: Option<VapidKeys>, subject: impl Into<String>, ttl_seconds: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            keys,
            subject: subject.into(),
            ttl_seconds,
        }
    }

    /// Build from configuration.
    ///
    /// Missing or malformed keys do not prevent startup: the problem is
    /// logged and every send fails with [`PushError::NotConfigured`].
    pub fn from_config(vapid: &VapidConfig, push: &PushConfig) -> Self {
        let keys = match VapidKeys::from_config(vapid) {
            Ok(keys) => {
                tracing::info!("VAPID keys configured successfully");
                Some(keys)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "VAPID keys unusable, push notifications will not work. \
                     Set VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY"
                );
                None
            }
        };

        Self::new(keys, vapid.subject.clone(), push.ttl_seconds)
    }

}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        let keys = self.keys.as_ref().ok_or(PushError::NotConfigured)?;

        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(keys.private_key_base64url(), &sub_info)
            .map_err(|e| PushError::Message(format!("VAPID signature: {}", e)))?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder
            .build()
            .map_err(|e| PushError::Message(format!("VAPID JWT: {}", e)))?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl_seconds);

        let message = builder
            .build()
            .map_err(|e| PushError::Message(e.to_string()))?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Request(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn is_configured(&self) -> bool {
        self.keys.is_some()
    }
}
