use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::metrics::SchedulerMetrics;
use crate::notification::{DeliveryTrigger, NotificationDispatcher};

use super::item::{ScheduleItemInput, ScheduleReceipt, ScheduleRequest, ScheduledItem};
use super::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Timer armed, may still be cancelled
    Pending,
    /// Timer elapsed and the delivery round is running; no longer cancellable
    Firing,
}

struct PendingEntry {
    item: ScheduledItem,
    state: EntryState,
    abort: AbortHandle,
}

/// Outcome of one element of a bulk schedule call
#[derive(Debug)]
pub struct BulkScheduleResult {
    /// Caller-supplied id, echoed back
    pub id: Option<Value>,
    pub result: Result<ScheduleReceipt, ScheduleError>,
}

/// Scheduler statistics
#[derive(Debug, Default)]
struct SchedulerCounters {
    /// Entries in the `Pending` state; changed only under the entry's map lock
    pending: AtomicUsize,
    scheduled: AtomicU64,
    rejected: AtomicU64,
    fired: AtomicU64,
    cancelled: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub pending: usize,
    pub total_scheduled: u64,
    pub total_rejected: u64,
    pub total_fired: u64,
    pub total_cancelled: u64,
}

/// Deferred notification delivery.
///
/// Every scheduled item owns a spawned task that sleeps until the fire time,
/// then broadcasts through the dispatcher against the registry as it is at
/// that moment. The pending map's per-key lock decides the race between a
/// timer waking up and `cancel_all`.
pub struct Scheduler {
    pending: Arc<DashMap<Uuid, PendingEntry>>,
    dispatcher: Arc<NotificationDispatcher>,
    counters: Arc<SchedulerCounters>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            dispatcher,
            counters: Arc::new(SchedulerCounters::default()),
        }
    }

    /// Arm a timer for one notification.
    ///
    /// Fails with [`ScheduleError::NotInFuture`] unless the fire time is
    /// strictly after now. Must be called from within a Tokio runtime.
    pub fn schedule_one(&self, request: ScheduleRequest) -> Result<ScheduleReceipt, ScheduleError> {
        let now = Utc::now();
        let delay_ms = (request.scheduled_time - now).num_milliseconds();

        if delay_ms <= 0 {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            SchedulerMetrics::record_rejected();
            return Err(ScheduleError::NotInFuture);
        }

        let delay = Duration::from_millis(delay_ms as u64);
        let item = ScheduledItem::from_request(request, now);
        let key = item.key;
        let scheduled_for = item.scheduled_time;
        let deadline = tokio::time::Instant::now() + delay;

        // Hold the slot while spawning so the timer can never observe a
        // missing entry and mistake it for a cancellation.
        let slot = self.pending.entry(key);
        let handle = tokio::spawn(fire_when_due(
            key,
            deadline,
            self.pending.clone(),
            self.dispatcher.clone(),
            self.counters.clone(),
        ));

        tracing::info!(
            key = %key,
            id = ?item.id,
            block_id = ?item.block_id,
            kind = item.kind().as_str(),
            scheduled_for = %scheduled_for,
            delay_ms = delay_ms,
            "Notification scheduled"
        );

        self.counters.pending.fetch_add(1, Ordering::Relaxed);
        slot.insert(PendingEntry {
            item,
            state: EntryState::Pending,
            abort: handle.abort_handle(),
        });

        self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        SchedulerMetrics::record_scheduled();
        SchedulerMetrics::set_pending(self.len());

        Ok(ScheduleReceipt {
            key,
            scheduled_for,
            delay,
        })
    }

    /// Schedule many items independently, in input order.
    ///
    /// An invalid item yields an error in its own slot and never stops the
    /// remaining items from being armed.
    pub fn schedule_bulk(&self, items: Vec<ScheduleItemInput>) -> Vec<BulkScheduleResult> {
        self.schedule_each(items.into_iter().map(|input| (input.id.clone(), Ok(input))))
    }

    /// Like [`Scheduler::schedule_bulk`] but for raw JSON elements, so a
    /// malformed element becomes a per-item error instead of failing the batch
    pub fn schedule_bulk_json(&self, items: Vec<Value>) -> Vec<BulkScheduleResult> {
        self.schedule_each(items.into_iter().map(|value| {
            let id = value.get("id").cloned();
            let input = serde_json::from_value::<ScheduleItemInput>(value)
                .map_err(|e| ScheduleError::InvalidItem(e.to_string()));
            (id, input)
        }))
    }

    fn schedule_each(
        &self,
        items: impl Iterator<Item = (Option<Value>, Result<ScheduleItemInput, ScheduleError>)>,
    ) -> Vec<BulkScheduleResult> {
        let results: Vec<BulkScheduleResult> = items
            .map(|(id, input)| {
                let id = id.filter(|v| !v.is_null());
                let result = input
                    .and_then(ScheduleItemInput::into_request)
                    .and_then(|request| self.schedule_one(request));
                if let Err(e) = &result {
                    tracing::warn!(id = ?id, error = %e, "Bulk item not scheduled");
                }
                BulkScheduleResult { id, result }
            })
            .collect();

        let scheduled = results.iter().filter(|r| r.result.is_ok()).count();
        tracing::info!(
            total = results.len(),
            scheduled = scheduled,
            rejected = results.len() - scheduled,
            "Bulk schedule processed"
        );

        results
    }

    /// Snapshot of items still waiting for their timer (no guaranteed order)
    pub fn list_pending(&self) -> Vec<ScheduledItem> {
        self.pending
            .iter()
            .filter(|entry| entry.state == EntryState::Pending)
            .map(|entry| entry.item.clone())
            .collect()
    }

    /// Cancel every pending item and return how many were cancelled.
    ///
    /// Items whose delivery round is already running are left to finish.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0usize;

        self.pending.retain(|_, entry| match entry.state {
            EntryState::Firing => true,
            EntryState::Pending => {
                entry.abort.abort();
                cancelled += 1;
                false
            }
        });

        if cancelled > 0 {
            self.counters.pending.fetch_sub(cancelled, Ordering::Relaxed);
            self.counters
                .cancelled
                .fetch_add(cancelled as u64, Ordering::Relaxed);
            SchedulerMetrics::record_cancelled(cancelled as u64);
        }
        SchedulerMetrics::set_pending(self.len());

        tracing::info!(cancelled = cancelled, "Cleared scheduled notifications");

        cancelled
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.counters.pending.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            pending: self.len(),
            total_scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            total_rejected: self.counters.rejected.load(Ordering::Relaxed),
            total_fired: self.counters.fired.load(Ordering::Relaxed),
            total_cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Drop all pending timers on process shutdown
    pub fn shutdown(&self) -> usize {
        let dropped = self.cancel_all();
        if dropped > 0 {
            tracing::warn!(dropped = dropped, "Pending scheduled notifications dropped at shutdown");
        }
        dropped
    }
}

/// Timer body for one scheduled item
async fn fire_when_due(
    key: Uuid,
    deadline: tokio::time::Instant,
    pending: Arc<DashMap<Uuid, PendingEntry>>,
    dispatcher: Arc<NotificationDispatcher>,
    counters: Arc<SchedulerCounters>,
) {
    tokio::time::sleep_until(deadline).await;

    let item = {
        let Some(mut entry) = pending.get_mut(&key) else {
            // Cancelled between wake-up and here
            return;
        };
        entry.state = EntryState::Firing;
        counters.pending.fetch_sub(1, Ordering::Relaxed);
        entry.item.clone()
    };

    let payload = item.payload();
    match dispatcher.broadcast(&payload, DeliveryTrigger::Scheduled).await {
        Ok(report) if report.attempted > 0 && !report.success() => {
            tracing::warn!(
                key = %key,
                id = ?item.id,
                title = %item.title,
                attempted = report.attempted,
                failed = report.failed,
                pruned = report.pruned,
                "Scheduled notification reached no subscriber"
            );
        }
        Ok(report) => {
            tracing::info!(
                key = %key,
                id = ?item.id,
                title = %item.title,
                attempted = report.attempted,
                delivered = report.delivered,
                pruned = report.pruned,
                "Scheduled notification sent"
            );
        }
        Err(e) => {
            tracing::error!(key = %key, id = ?item.id, error = %e, "Scheduled notification failed");
        }
    }

    pending.remove(&key);
    counters.fired.fetch_add(1, Ordering::Relaxed);
    SchedulerMetrics::record_fired();
    SchedulerMetrics::set_pending(counters.pending.load(Ordering::Relaxed));
}
