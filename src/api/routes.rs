use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::notifications::{
    clear_scheduled, list_scheduled, schedule_bulk, schedule_notification, send_notification,
};
use super::subscriptions::{list_subscriptions, subscribe, unsubscribe, vapid_public_key};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Subscriptions
        .route("/vapid-public-key", get(vapid_public_key))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/subscriptions", get(list_subscriptions))
        // Immediate delivery
        .route("/send-notification", post(send_notification))
        // Scheduling
        .route("/schedule-notification", post(schedule_notification))
        .route("/schedule-bulk", post(schedule_bulk))
        .route("/clear-scheduled", post(clear_scheduled))
        .route("/scheduled", get(list_scheduled))
}
