//! Subscription endpoints: register, remove, list.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::Result;
use crate::server::AppState;
use crate::subscriptions::AddOutcome;

use super::extract::ApiJson;
use super::models::{
    MessageResponse, SubscribeRequest, SubscriptionListResponse, UnsubscribeRequest,
    VapidPublicKeyResponse,
};

/// GET /vapid-public-key
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<VapidPublicKeyResponse> {
    Json(VapidPublicKeyResponse {
        public_key: state.settings.vapid.public_key.clone(),
    })
}

/// POST /subscribe
#[tracing::instrument(name = "api.subscribe", skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let subscription = request.into_subscription()?;
    let endpoint = subscription.endpoint.clone();

    match state.registry.add(subscription) {
        AddOutcome::Inserted => tracing::info!(endpoint = %endpoint, "New subscription"),
        AddOutcome::Replaced => {
            tracing::info!(endpoint = %endpoint, "Subscription keys refreshed")
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Subscription saved")),
    ))
}

/// POST /unsubscribe
///
/// Unknown or missing endpoints are a no-op that still reports success.
#[tracing::instrument(name = "api.unsubscribe", skip(state, request))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UnsubscribeRequest>,
) -> Json<MessageResponse> {
    let removed = request
        .endpoint
        .as_deref()
        .map(|endpoint| state.registry.remove_by_endpoint(endpoint))
        .unwrap_or(0);

    tracing::info!(endpoint = ?request.endpoint, removed = removed, "Unsubscribed");

    Json(MessageResponse::new("Unsubscribed successfully"))
}

/// GET /subscriptions
pub async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionListResponse> {
    let subscriptions = state.registry.list_redacted();
    Json(SubscriptionListResponse {
        count: subscriptions.len(),
        subscriptions,
    })
}
