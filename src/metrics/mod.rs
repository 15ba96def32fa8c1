//! Prometheus metrics for the push dispatch service.
//!
//! - Subscription metrics (registry size, subscribe/unsubscribe/prune counts)
//! - Delivery metrics (rounds by trigger, per-recipient outcomes, round latency)
//! - Scheduler metrics (pending timers, fired, cancelled, rejected)

mod helpers;

pub use helpers::{encode_metrics, DeliveryMetrics, SchedulerMetrics, SubscriptionMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push";

lazy_static! {
    // ============================================================================
    // Subscription Metrics
    // ============================================================================

    /// Subscriptions currently held in the registry
    pub static ref SUBSCRIPTIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_subscriptions_active", METRIC_PREFIX),
        "Number of subscriptions currently registered"
    ).unwrap();

    pub static ref SUBSCRIPTIONS_ADDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_subscriptions_added_total", METRIC_PREFIX),
        "Total subscribe calls accepted"
    ).unwrap();

    /// Entries removed by unsubscribe or by pruning gone endpoints
    pub static ref SUBSCRIPTIONS_REMOVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_subscriptions_removed_total", METRIC_PREFIX),
        "Total subscription entries removed"
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Delivery rounds by trigger (immediate, scheduled)
    pub static ref DELIVERY_ROUNDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_delivery_rounds_total", METRIC_PREFIX),
        "Total delivery rounds",
        &["trigger"]
    ).unwrap();

    /// Per-recipient outcomes (delivered, failed_transient, failed_invalid)
    pub static ref DELIVERY_OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_delivery_outcomes_total", METRIC_PREFIX),
        "Total per-recipient delivery outcomes",
        &["outcome"]
    ).unwrap();

    /// Wall time of a whole delivery round in seconds
    pub static ref DELIVERY_ROUND_LATENCY: Histogram = register_histogram!(
        format!("{}_delivery_round_latency_seconds", METRIC_PREFIX),
        "Delivery round latency in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Scheduler Metrics
    // ============================================================================

    pub static ref SCHEDULED_PENDING: IntGauge = register_int_gauge!(
        format!("{}_scheduled_pending", METRIC_PREFIX),
        "Number of scheduled notifications waiting to fire"
    ).unwrap();

    pub static ref SCHEDULED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_scheduled_total", METRIC_PREFIX),
        "Total notifications scheduled"
    ).unwrap();

    pub static ref SCHEDULED_FIRED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_scheduled_fired_total", METRIC_PREFIX),
        "Total scheduled notifications fired"
    ).unwrap();

    pub static ref SCHEDULED_CANCELLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_scheduled_cancelled_total", METRIC_PREFIX),
        "Total scheduled notifications cancelled before firing"
    ).unwrap();

    /// Schedule requests refused because the fire time was not in the future
    pub static ref SCHEDULED_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_scheduled_rejected_total", METRIC_PREFIX),
        "Total schedule requests rejected"
    ).unwrap();
}
