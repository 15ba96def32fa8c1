//! End-to-end tests driving the HTTP router against an in-memory push transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use push_dispatch_service::config::Settings;
use push_dispatch_service::push::{PushError, PushTransport};
use push_dispatch_service::server::{create_app, AppState};
use push_dispatch_service::subscriptions::PushSubscription;

/// Records every delivery; endpoints can be scripted to answer with an HTTP status
#[derive(Default)]
struct FakeTransport {
    sent: Mutex<Vec<(String, Value)>>,
    statuses: Mutex<HashMap<String, u16>>,
}

impl FakeTransport {
    fn respond_with(&self, endpoint: &str, status: u16) {
        self.statuses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), status);
    }

    fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        if let Some(status) = self.statuses.lock().unwrap().get(&subscription.endpoint) {
            return Err(PushError::Rejected {
                status: *status,
                body: String::new(),
            });
        }
        let value: Value = serde_json::from_slice(payload).unwrap();
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), value));
        Ok(())
    }
}

fn create_test_app() -> (Router, AppState, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::default());
    let state = AppState::with_transport(Settings::default(), transport.clone());
    (create_app(state.clone()), state, transport)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn subscription(endpoint: &str) -> Value {
    json!({
        "endpoint": endpoint,
        "expirationTime": null,
        "keys": {"p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM", "auth": "tBHItJI5svbpez7KI4CCXg"}
    })
}

fn in_ms(ms: i64) -> String {
    (Utc::now() + chrono::Duration::milliseconds(ms)).to_rfc3339()
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn test_subscribe_list_unsubscribe() {
    let (app, _, _) = create_test_app();

    let (status, body) = call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"message": "Subscription saved"}));

    let (_, list) = call(&app, "GET", "/subscriptions", None).await;
    assert_eq!(list["count"], json!(1));
    assert_eq!(list["subscriptions"][0], json!({"endpoint": "https://push.example.com/a"}));

    let (status, body) = call(
        &app,
        "POST",
        "/unsubscribe",
        Some(json!({"endpoint": "https://push.example.com/a"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Unsubscribed successfully"}));

    let (_, list) = call(&app, "GET", "/subscriptions", None).await;
    assert_eq!(list["count"], json!(0));
}

#[tokio::test]
async fn test_unsubscribe_unknown_endpoint_is_noop() {
    let (app, _, _) = create_test_app();

    let (status, _) = call(
        &app,
        "POST",
        "/unsubscribe",
        Some(json!({"endpoint": "https://push.example.com/never"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_subscribe_without_keys_is_rejected() {
    let (app, state, _) = create_test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/subscribe",
        Some(json!({"endpoint": "https://push.example.com/a"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(state.registry.count(), 0);
}

#[tokio::test]
async fn test_subscription_listing_never_exposes_keys() {
    let (app, _, _) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let (_, list) = call(&app, "GET", "/subscriptions", None).await;
    let text = list.to_string();
    assert!(!text.contains("p256dh"));
    assert!(!text.contains("auth"));
    assert!(!text.contains("tBHItJI5svbpez7KI4CCXg"));
}

#[tokio::test]
async fn test_resubscribe_replaces_instead_of_duplicating() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let (_, body) = call(&app, "POST", "/send-notification", Some(json!({}))).await;
    assert_eq!(body["sentTo"], json!(1));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_vapid_public_key_is_null_when_unset() {
    let (app, _, _) = create_test_app();

    let (status, body) = call(&app, "GET", "/vapid-public-key", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"publicKey": null}));
}

// ============================================================================
// Immediate delivery
// ============================================================================

#[tokio::test]
async fn test_send_notification_applies_defaults() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let (status, body) = call(&app, "POST", "/send-notification", Some(json!({"title": "Focus"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Notifications sent successfully"));
    assert_eq!(body["sentTo"], json!(1));
    assert_eq!(body["delivered"], json!(1));

    let sent = transport.sent();
    assert_eq!(
        sent[0].1,
        json!({
            "title": "Focus",
            "body": "Time block notification",
            "icon": "/pwa-192x192.png",
            "badge": "/pwa-192x192.png",
            "data": {}
        })
    );
}

#[tokio::test]
async fn test_send_notification_accepts_empty_body() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let (status, _) = call(&app, "POST", "/send-notification", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transport.sent()[0].1["title"], json!("Time Diet"));
}

#[tokio::test]
async fn test_gone_endpoint_is_pruned() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/live"))).await;
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/gone"))).await;
    transport.respond_with("https://push.example.com/gone", 410);

    let (_, first) = call(&app, "POST", "/send-notification", Some(json!({}))).await;
    assert_eq!(first["sentTo"], json!(2));
    assert_eq!(first["pruned"], json!(1));

    let (_, list) = call(&app, "GET", "/subscriptions", None).await;
    assert_eq!(list["count"], json!(1));

    let (_, second) = call(&app, "POST", "/send-notification", Some(json!({}))).await;
    assert_eq!(second["sentTo"], json!(1));
}

#[tokio::test]
async fn test_transient_failure_keeps_subscription() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/flaky"))).await;
    transport.respond_with("https://push.example.com/flaky", 500);

    let (status, body) = call(&app, "POST", "/send-notification", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failed"], json!(1));
    assert_eq!(body["pruned"], json!(0));

    let (_, list) = call(&app, "GET", "/subscriptions", None).await;
    assert_eq!(list["count"], json!(1));
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test]
async fn test_schedule_in_past_is_rejected() {
    let (app, _, _) = create_test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/schedule-notification",
        Some(json!({"scheduledTime": in_ms(-5_000)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Scheduled time must be in the future"}));

    let (_, scheduled) = call(&app, "GET", "/scheduled", None).await;
    assert_eq!(scheduled["count"], json!(0));
}

#[tokio::test]
async fn test_schedule_without_time_is_rejected() {
    let (app, state, _) = create_test_app();

    let (status, body) = call(&app, "POST", "/schedule-notification", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(state.scheduler.is_empty());
}

#[tokio::test]
async fn test_scheduled_notification_reaches_late_subscriber() {
    let (app, _, transport) = create_test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/schedule-notification",
        Some(json!({"scheduledTime": in_ms(200), "blockId": "deep-work"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Notification scheduled successfully"));
    assert!(body["scheduledFor"].as_str().unwrap().ends_with('Z'));
    assert_eq!(body["delay"], json!("0 seconds"));

    // Subscribes after scheduling
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/late"))).await;

    tokio::time::timeout(Duration::from_secs(2), async {
        while transport.sent().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("scheduled notification never fired");

    let sent = transport.sent();
    assert_eq!(sent[0].0, "https://push.example.com/late");
    assert_eq!(sent[0].1["title"], json!("Time Diet Reminder"));
    assert_eq!(sent[0].1["data"], json!({"blockId": "deep-work", "type": "time-block"}));

    let (_, scheduled) = call(&app, "GET", "/scheduled", None).await;
    assert_eq!(scheduled["count"], json!(0));
}

#[tokio::test]
async fn test_bulk_with_one_past_item() {
    let (app, _, _) = create_test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/schedule-bulk",
        Some(json!({"notifications": [
            {"id": "a", "scheduledTime": in_ms(60_000)},
            {"id": "b", "scheduledTime": in_ms(-60_000)},
            {"id": "c", "scheduledTime": in_ms(120_000), "isEarlyWarning": true}
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalScheduled"], json!(2));

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["id"], json!("a"));
    assert_eq!(results[0]["success"], json!(true));
    assert_eq!(results[1]["id"], json!("b"));
    assert_eq!(results[1]["success"], json!(false));
    assert_eq!(results[1]["error"], json!("Scheduled time must be in the future"));
    assert_eq!(results[2]["success"], json!(true));

    let (_, scheduled) = call(&app, "GET", "/scheduled", None).await;
    assert_eq!(scheduled["count"], json!(2));
    // Soonest first
    assert_eq!(scheduled["notifications"][0]["id"], json!("a"));
    assert_eq!(scheduled["notifications"][1]["isEarlyWarning"], json!(true));

    call(&app, "POST", "/clear-scheduled", None).await;
}

#[tokio::test]
async fn test_bulk_requires_array() {
    let (app, state, _) = create_test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/schedule-bulk",
        Some(json!({"notifications": {"id": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(state.scheduler.is_empty());
}

#[tokio::test]
async fn test_clear_scheduled_prevents_delivery() {
    let (app, _, transport) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let items: Vec<Value> = (0..3)
        .map(|i| json!({"id": i, "scheduledTime": in_ms(200)}))
        .collect();
    call(&app, "POST", "/schedule-bulk", Some(json!({"notifications": items}))).await;

    let (status, body) = call(&app, "POST", "/clear-scheduled", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clearedCount"], json!(3));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(transport.sent().is_empty());

    let (_, again) = call(&app, "POST", "/clear-scheduled", None).await;
    assert_eq!(again["clearedCount"], json!(0));
}

// ============================================================================
// Health, stats & metrics
// ============================================================================

#[tokio::test]
async fn test_health_and_stats() {
    let (app, _, _) = create_test_app();
    call(&app, "POST", "/subscribe", Some(subscription("https://push.example.com/a"))).await;

    let (status, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["subscriptions"], json!(1));
    assert_eq!(health["pendingScheduled"], json!(0));
    assert_eq!(health["vapidConfigured"], json!(true));

    call(&app, "POST", "/send-notification", Some(json!({}))).await;

    let (_, stats) = call(&app, "GET", "/stats", None).await;
    assert_eq!(stats["subscriptions"]["totalSubscriptions"], json!(1));
    assert_eq!(stats["delivery"]["totalRounds"], json!(1));
    assert_eq!(stats["delivery"]["totalDelivered"], json!(1));
    assert_eq!(stats["scheduler"]["pending"], json!(0));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("push_subscriptions_active"));
    assert!(text.contains("push_scheduled_pending"));
}
