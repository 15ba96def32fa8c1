//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::scheduler::SchedulerStats;
use crate::server::AppState;
use crate::subscriptions::RegistryStats;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub subscriptions: usize,
    pub pending_scheduled: usize,
    pub vapid_configured: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub subscriptions: RegistryStats,
    pub delivery: DispatcherStatsSnapshot,
    pub scheduler: SchedulerStats,
}

/// GET /health
///
/// `degraded` when the transport cannot send (VAPID keys missing or invalid).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.transport_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        subscriptions: state.registry.count(),
        pending_scheduled: state.scheduler.len(),
        vapid_configured: state.transport_configured,
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        subscriptions: state.registry.stats(),
        delivery: state.dispatcher.stats(),
        scheduler: state.scheduler.stats(),
    })
}
