//! API layer - HTTP endpoint handlers organized by concern.

mod extract;
mod health;
mod metrics;
pub mod models;
mod notifications;
mod routes;
mod subscriptions;

pub use extract::{optional_json, ApiJson};
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use notifications::{
    clear_scheduled, list_scheduled, schedule_bulk, schedule_notification, send_notification,
};
pub use routes::api_routes;
pub use subscriptions::{list_subscriptions, subscribe, unsubscribe, vapid_public_key};
