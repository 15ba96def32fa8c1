//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    DELIVERY_OUTCOMES_TOTAL, DELIVERY_ROUNDS_TOTAL, DELIVERY_ROUND_LATENCY, SCHEDULED_CANCELLED_TOTAL,
    SCHEDULED_FIRED_TOTAL, SCHEDULED_PENDING, SCHEDULED_REJECTED_TOTAL, SCHEDULED_TOTAL,
    SUBSCRIPTIONS_ACTIVE, SUBSCRIPTIONS_ADDED_TOTAL, SUBSCRIPTIONS_REMOVED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for subscription registry metrics
pub struct SubscriptionMetrics;

impl SubscriptionMetrics {
    pub fn record_added() {
        SUBSCRIPTIONS_ADDED_TOTAL.inc();
    }

    pub fn record_removed(count: u64) {
        SUBSCRIPTIONS_REMOVED_TOTAL.inc_by(count);
    }

    pub fn set_active(count: usize) {
        SUBSCRIPTIONS_ACTIVE.set(count as i64);
    }
}

/// Helper struct for delivery round metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record a round started by `trigger` ("immediate" or "scheduled")
    pub fn record_round(trigger: &str) {
        DELIVERY_ROUNDS_TOTAL.with_label_values(&[trigger]).inc();
    }

    /// Record one recipient's outcome
    pub fn record_outcome(outcome: &str) {
        DELIVERY_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_latency(elapsed: Duration) {
        DELIVERY_ROUND_LATENCY.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for scheduler metrics
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    pub fn record_scheduled() {
        SCHEDULED_TOTAL.inc();
    }

    pub fn record_rejected() {
        SCHEDULED_REJECTED_TOTAL.inc();
    }

    pub fn record_fired() {
        SCHEDULED_FIRED_TOTAL.inc();
    }

    pub fn record_cancelled(count: u64) {
        SCHEDULED_CANCELLED_TOTAL.inc_by(count);
    }

    pub fn set_pending(count: usize) {
        SCHEDULED_PENDING.set(count as i64);
    }
}
