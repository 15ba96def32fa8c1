//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::scheduler::{BulkScheduleResult, ScheduledItem};
use crate::subscriptions::{PushSubscription, SubscriptionSummary};

/// Body of `POST /subscribe`; every field optional so missing ones get a readable error
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub endpoint: Option<String>,
    pub keys: Option<SubscribeKeys>,
    pub expiration_time: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeKeys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

impl SubscribeRequest {
    pub fn into_subscription(self) -> Result<PushSubscription, AppError> {
        let keys = self.keys.unwrap_or_default();
        let mut subscription = PushSubscription::new(
            self.endpoint.unwrap_or_default(),
            keys.p256dh.unwrap_or_default(),
            keys.auth.unwrap_or_default(),
        );
        subscription.expiration_time = self.expiration_time.filter(|v| !v.is_null());
        subscription.validate().map_err(AppError::Validation)?;
        Ok(subscription)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendNotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidPublicKeyResponse {
    /// `null` when no key is configured
    pub public_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub message: String,
    /// Recipients attempted in this round
    pub sent_to: usize,
    pub delivered: usize,
    pub failed: usize,
    pub pruned: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNotificationResponse {
    pub message: String,
    pub scheduled_for: String,
    pub delay: String,
}

/// One element of the `/schedule-bulk` result list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResponse {
    pub id: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BulkScheduleResult> for BulkItemResponse {
    fn from(item: BulkScheduleResult) -> Self {
        match item.result {
            Ok(receipt) => Self {
                id: item.id,
                success: true,
                scheduled_for: Some(receipt.scheduled_for_iso()),
                delay: Some(receipt.delay_label()),
                error: None,
            },
            Err(e) => Self {
                id: item.id,
                success: false,
                scheduled_for: None,
                delay: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkScheduleResponse {
    pub message: String,
    pub results: Vec<BulkItemResponse>,
    /// Items armed by this call
    pub total_scheduled: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearScheduledResponse {
    pub message: String,
    pub cleared_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ScheduledListResponse {
    pub count: usize,
    pub notifications: Vec<ScheduledItem>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionListResponse {
    pub count: usize,
    pub subscriptions: Vec<SubscriptionSummary>,
}
