//! Immediate and scheduled notification endpoints.

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::notification::{DeliveryTrigger, NotificationBuilder, PayloadDefaults};
use crate::scheduler::ScheduleItemInput;
use crate::server::AppState;

use super::extract::{optional_json, ApiJson};
use super::models::{
    BulkItemResponse, BulkScheduleResponse, ClearScheduledResponse, ScheduleNotificationResponse,
    ScheduledListResponse, SendNotificationRequest, SendNotificationResponse,
};

/// POST /send-notification
#[tracing::instrument(name = "api.send_notification", skip(state, body))]
pub async fn send_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SendNotificationResponse>> {
    let request: SendNotificationRequest = optional_json(&body)?;

    let payload = NotificationBuilder::new(PayloadDefaults::IMMEDIATE)
        .title(request.title)
        .body(request.body)
        .icon(request.icon)
        .badge(request.badge)
        .data(request.data)
        .build();

    let report = state
        .dispatcher
        .broadcast(&payload, DeliveryTrigger::Immediate)
        .await?;

    Ok(Json(SendNotificationResponse {
        message: "Notifications sent successfully".to_string(),
        sent_to: report.attempted,
        delivered: report.delivered,
        failed: report.failed,
        pruned: report.pruned,
    }))
}

/// POST /schedule-notification
#[tracing::instrument(name = "api.schedule_notification", skip(state, input))]
pub async fn schedule_notification(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ScheduleItemInput>,
) -> Result<Json<ScheduleNotificationResponse>> {
    let request = input.into_request()?;
    let receipt = state.scheduler.schedule_one(request)?;

    Ok(Json(ScheduleNotificationResponse {
        message: "Notification scheduled successfully".to_string(),
        scheduled_for: receipt.scheduled_for_iso(),
        delay: receipt.delay_label(),
    }))
}

/// POST /schedule-bulk
#[tracing::instrument(name = "api.schedule_bulk", skip(state, body))]
pub async fn schedule_bulk(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<BulkScheduleResponse>> {
    let items = match body.get("notifications") {
        Some(Value::Array(items)) => items.clone(),
        _ => {
            return Err(AppError::Validation(
                "notifications must be an array".to_string(),
            ))
        }
    };

    let total = items.len();
    let results: Vec<BulkItemResponse> = state
        .scheduler
        .schedule_bulk_json(items)
        .into_iter()
        .map(BulkItemResponse::from)
        .collect();
    let total_scheduled = results.iter().filter(|r| r.success).count();

    Ok(Json(BulkScheduleResponse {
        message: format!("Scheduled {} of {} notifications", total_scheduled, total),
        results,
        total_scheduled,
    }))
}

/// POST /clear-scheduled
#[tracing::instrument(name = "api.clear_scheduled", skip(state))]
pub async fn clear_scheduled(State(state): State<AppState>) -> Json<ClearScheduledResponse> {
    let cleared_count = state.scheduler.cancel_all();

    Json(ClearScheduledResponse {
        message: format!("Cleared {} scheduled notifications", cleared_count),
        cleared_count,
    })
}

/// GET /scheduled, soonest first
pub async fn list_scheduled(State(state): State<AppState>) -> Json<ScheduledListResponse> {
    let mut notifications = state.scheduler.list_pending();
    notifications.sort_by(|a, b| {
        a.scheduled_time
            .cmp(&b.scheduled_time)
            .then(a.created_at.cmp(&b.created_at))
    });

    Json(ScheduledListResponse {
        count: notifications.len(),
        notifications,
    })
}
