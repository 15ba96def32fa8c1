use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::config::PushConfig;
use crate::metrics::DeliveryMetrics;
use crate::push::{PushError, PushTransport};
use crate::subscriptions::{PushSubscription, SubscriptionRegistry};
use crate::telemetry::attributes;

use super::NotificationPayload;

/// Default number of concurrent push attempts within one round
const MAX_CONCURRENT_SENDS: usize = 100;

/// Failure of a delivery round as a whole (individual recipients never cause this)
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to serialize notification payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What started a delivery round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTrigger {
    Immediate,
    Scheduled,
}

impl DeliveryTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryTrigger::Immediate => "immediate",
            DeliveryTrigger::Scheduled => "scheduled",
        }
    }
}

/// Outcome of one push attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum DeliveryOutcome {
    /// The push service accepted the message
    Delivered,
    /// Any failure that does not prove the endpoint is dead; subscription kept
    FailedTransient { reason: String },
    /// The push service reported the endpoint gone; subscription pruned
    FailedInvalid { status: u16 },
}

impl DeliveryOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::FailedTransient { .. } => "failed_transient",
            DeliveryOutcome::FailedInvalid { .. } => "failed_invalid",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientOutcome {
    pub endpoint: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

/// Result of one delivery round
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    /// Round identifier for log correlation
    pub notification_id: Uuid,
    /// Number of subscriptions an attempt was made for
    pub attempted: usize,
    pub delivered: usize,
    /// Transient and invalid failures together
    pub failed: usize,
    /// Registry entries removed because their endpoint is gone
    pub pruned: usize,
    /// Per-recipient outcomes, in the order the subscriptions were supplied
    pub outcomes: Vec<RecipientOutcome>,
}

impl DeliveryReport {
    fn empty(notification_id: Uuid) -> Self {
        Self {
            notification_id,
            attempted: 0,
            delivered: 0,
            failed: 0,
            pruned: 0,
            outcomes: Vec::new(),
        }
    }

    /// Whether any recipient received the notification
    pub fn success(&self) -> bool {
        self.delivered > 0
    }
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Delivery rounds started
    pub total_rounds: AtomicU64,
    pub immediate_rounds: AtomicU64,
    pub scheduled_rounds: AtomicU64,
    /// Push attempts made
    pub total_attempted: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_failed: AtomicU64,
    /// Subscriptions pruned after a gone/not-found response
    pub total_pruned: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_rounds: self.total_rounds.load(Ordering::Relaxed),
            immediate_rounds: self.immediate_rounds.load(Ordering::Relaxed),
            scheduled_rounds: self.scheduled_rounds.load(Ordering::Relaxed),
            total_attempted: self.total_attempted.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_pruned: self.total_pruned.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatsSnapshot {
    pub total_rounds: u64,
    pub immediate_rounds: u64,
    pub scheduled_rounds: u64,
    pub total_attempted: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_pruned: u64,
}

/// Fans a payload out to push subscriptions and prunes dead endpoints.
pub struct NotificationDispatcher {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn PushTransport>,
    send_timeout: Option<Duration>,
    max_concurrent_sends: usize,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    /// Create a dispatcher with default limits
    pub fn new(registry: Arc<SubscriptionRegistry>, transport: Arc<dyn PushTransport>) -> Self {
        Self::with_config(registry, transport, &PushConfig::default())
    }

    /// Create a dispatcher honouring the timeout and concurrency settings
    pub fn with_config(
        registry: Arc<SubscriptionRegistry>,
        transport: Arc<dyn PushTransport>,
        config: &PushConfig,
    ) -> Self {
        let send_timeout = match config.send_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let max_concurrent_sends = match config.max_concurrent_sends {
            0 => MAX_CONCURRENT_SENDS,
            n => n,
        };

        Self {
            registry,
            transport,
            send_timeout,
            max_concurrent_sends,
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver to every subscription currently in the registry
    #[tracing::instrument(
        name = "dispatcher.broadcast",
        skip(self, payload),
        fields(title = %payload.title, trigger = trigger.as_str())
    )]
    pub async fn broadcast(
        &self,
        payload: &NotificationPayload,
        trigger: DeliveryTrigger,
    ) -> Result<DeliveryReport, DeliveryError> {
        let subscriptions = self.registry.list();
        self.deliver(payload, &subscriptions, trigger).await
    }

    /// Deliver one payload to the given subscriptions.
    ///
    /// Every attempt resolves independently; endpoints reported gone are
    /// removed from the registry before this returns. Only a payload that
    /// cannot be serialized fails the round.
    #[tracing::instrument(
        name = "dispatcher.deliver",
        skip(self, payload, subscriptions),
        fields(recipients = subscriptions.len(), trigger = trigger.as_str())
    )]
    pub async fn deliver(
        &self,
        payload: &NotificationPayload,
        subscriptions: &[PushSubscription],
        trigger: DeliveryTrigger,
    ) -> Result<DeliveryReport, DeliveryError> {
        let notification_id = Uuid::new_v4();
        let span = tracing::Span::current();
        for attr in [
            attributes::notification_id(notification_id),
            attributes::trigger(trigger.as_str()),
            attributes::recipient_count(subscriptions.len()),
        ] {
            span.set_attribute(attr.key, attr.value);
        }

        // Serialized once; every recipient gets identical bytes
        let body = serde_json::to_vec(payload)?;

        self.stats.total_rounds.fetch_add(1, Ordering::Relaxed);
        let trigger_rounds = match trigger {
            DeliveryTrigger::Immediate => &self.stats.immediate_rounds,
            DeliveryTrigger::Scheduled => &self.stats.scheduled_rounds,
        };
        trigger_rounds.fetch_add(1, Ordering::Relaxed);
        DeliveryMetrics::record_round(trigger.as_str());

        if subscriptions.is_empty() {
            tracing::info!(notification_id = %notification_id, "No subscriptions to deliver to");
            return Ok(DeliveryReport::empty(notification_id));
        }

        tracing::info!(
            notification_id = %notification_id,
            recipients = subscriptions.len(),
            "Sending notification to subscribers"
        );

        let start = Instant::now();
        let mut report = DeliveryReport::empty(notification_id);
        let mut indexed = Vec::with_capacity(subscriptions.len());
        let mut futures = FuturesUnordered::new();

        for (index, subscription) in subscriptions.iter().enumerate() {
            futures.push(self.attempt(index, subscription, &body));

            // Process completed attempts when we hit the concurrency limit
            while futures.len() >= self.max_concurrent_sends {
                match futures.next().await {
                    Some((index, result)) => {
                        let outcome = self.classify(&subscriptions[index], result, &mut report);
                        indexed.push((index, outcome));
                    }
                    None => break,
                }
            }
        }

        while let Some((index, result)) = futures.next().await {
            let outcome = self.classify(&subscriptions[index], result, &mut report);
            indexed.push((index, outcome));
        }

        indexed.sort_by_key(|(index, _)| *index);
        report.outcomes = indexed.into_iter().map(|(_, outcome)| outcome).collect();
        report.attempted = subscriptions.len();

        self.stats
            .total_attempted
            .fetch_add(report.attempted as u64, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.stats
            .total_pruned
            .fetch_add(report.pruned as u64, Ordering::Relaxed);
        DeliveryMetrics::record_latency(start.elapsed());

        tracing::info!(
            notification_id = %notification_id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            pruned = report.pruned,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Delivery round complete"
        );

        Ok(report)
    }

    /// One push attempt, bounded by the send timeout when configured
    async fn attempt(
        &self,
        index: usize,
        subscription: &PushSubscription,
        body: &[u8],
    ) -> (usize, Result<(), PushError>) {
        let send = self.transport.send(subscription, body);

        let result = match self.send_timeout {
            Some(limit) => match tokio::time::timeout(limit, send).await {
                Ok(result) => result,
                Err(_) => Err(PushError::TimedOut {
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => send.await,
        };

        (index, result)
    }

    /// Turn an attempt result into an outcome, pruning gone endpoints
    fn classify(
        &self,
        subscription: &PushSubscription,
        result: Result<(), PushError>,
        report: &mut DeliveryReport,
    ) -> RecipientOutcome {
        let outcome = match result {
            Ok(()) => {
                report.delivered += 1;
                tracing::debug!(endpoint = %subscription.endpoint, "Notification delivered");
                DeliveryOutcome::Delivered
            }
            Err(e) if e.is_endpoint_gone() => {
                report.failed += 1;
                let status = e.status_code().unwrap_or_default();
                let removed = self.registry.remove_by_endpoint(&subscription.endpoint);
                report.pruned += removed;
                tracing::warn!(
                    endpoint = %subscription.endpoint,
                    status = status,
                    removed = removed,
                    "Push endpoint gone, removing invalid subscription"
                );
                DeliveryOutcome::FailedInvalid { status }
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    endpoint = %subscription.endpoint,
                    status = ?e.status_code(),
                    error = %e,
                    "Failed to deliver notification"
                );
                DeliveryOutcome::FailedTransient {
                    reason: e.to_string(),
                }
            }
        };

        DeliveryMetrics::record_outcome(outcome.metric_label());

        RecipientOutcome {
            endpoint: subscription.endpoint.clone(),
            outcome,
        }
    }
}
