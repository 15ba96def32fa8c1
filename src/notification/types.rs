use serde::{Deserialize, Serialize};

/// Icon and badge shown when the caller does not supply one
pub const DEFAULT_ICON: &str = "/pwa-192x192.png";

/// Fallback title/body for a payload, depending on how it was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadDefaults {
    pub title: &'static str,
    pub body: &'static str,
}

impl PayloadDefaults {
    /// Defaults for `POST /send-notification`
    pub const IMMEDIATE: Self = Self {
        title: "Time Diet",
        body: "Time block notification",
    };

    /// Defaults for notifications fired by the scheduler
    pub const SCHEDULED: Self = Self {
        title: "Time Diet Reminder",
        body: "Time to start your next block!",
    };
}

/// Notification body delivered to every recipient of one round.
///
/// This is what the client's service worker receives and renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Opaque data handed to the client's notification click handler
    pub data: serde_json::Value,
}

/// Builder for notification payloads.
///
/// Absent or empty fields fall back to the configured [`PayloadDefaults`];
/// a missing or falsy `data` becomes an empty object.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    defaults: PayloadDefaults,
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    data: Option<serde_json::Value>,
}

impl NotificationBuilder {
    /// Create a new notification builder
    pub fn new(defaults: PayloadDefaults) -> Self {
        Self {
            defaults,
            title: None,
            body: None,
            icon: None,
            badge: None,
            data: None,
        }
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    pub fn icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn badge(mut self, badge: Option<String>) -> Self {
        self.badge = badge;
        self
    }

    pub fn data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Build the payload
    pub fn build(self) -> NotificationPayload {
        NotificationPayload {
            title: or_default(self.title, self.defaults.title),
            body: or_default(self.body, self.defaults.body),
            icon: or_default(self.icon, DEFAULT_ICON),
            badge: or_default(self.badge, DEFAULT_ICON),
            data: self
                .data
                .filter(is_truthy)
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        }
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
