use async_trait::async_trait;
use thiserror::Error;

use crate::subscriptions::PushSubscription;

/// Errors a single push attempt can end with
#[derive(Debug, Clone, Error)]
pub enum PushError {
    /// The push service answered with a non-success status
    #[error("Push service rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The HTTP request itself failed (DNS, TLS, connection reset, ...)
    #[error("Push request failed: {0}")]
    Request(String),

    /// Encryption or VAPID signing failed before anything was sent
    #[error("Failed to build push message: {0}")]
    Message(String),

    /// No usable VAPID key pair was configured at startup
    #[error("VAPID keys are not configured")]
    NotConfigured,

    /// The attempt did not resolve within the configured bound
    #[error("Push attempt timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
}

impl PushError {
    /// HTTP status reported by the push service, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PushError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the push service reports the subscription no longer exists
    /// (404 Not Found or 410 Gone).
    pub fn is_endpoint_gone(&self) -> bool {
        matches!(self.status_code(), Some(404) | Some(410))
    }
}

/// Sends one already-serialized payload to one subscription.
///
/// Implementations must be safe to call concurrently; a delivery round
/// issues many sends at once against a single transport.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError>;

    /// Whether the transport can deliver at all (keys present)
    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gone_statuses() {
        let gone = PushError::Rejected {
            status: 410,
            body: String::new(),
        };
        let not_found = PushError::Rejected {
            status: 404,
            body: String::new(),
        };
        assert!(gone.is_endpoint_gone());
        assert!(not_found.is_endpoint_gone());
    }

    #[test]
    fn test_other_errors_are_not_gone() {
        let server_error = PushError::Rejected {
            status: 500,
            body: "boom".to_string(),
        };
        let rate_limited = PushError::Rejected {
            status: 429,
            body: String::new(),
        };
        assert!(!server_error.is_endpoint_gone());
        assert!(!rate_limited.is_endpoint_gone());
        assert!(!PushError::Request("connection reset".to_string()).is_endpoint_gone());
        assert!(!PushError::NotConfigured.is_endpoint_gone());
        assert!(!PushError::TimedOut { after_ms: 10 }.is_endpoint_gone());
        assert_eq!(server_error.status_code(), Some(500));
        assert_eq!(PushError::NotConfigured.status_code(), None);
    }
}
