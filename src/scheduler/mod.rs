//! Timer-based deferred delivery: schedule, enumerate and cancel notifications.
//!
//! Item lifecycle is `pending -> fired` or `pending -> cancelled`. Both end
//! states discard the item; no history is kept.

mod item;
mod timers;

use thiserror::Error;

pub use item::{
    delay_label, format_millis, parse_scheduled_time, ScheduleItemInput, ScheduleReceipt,
    ScheduleRequest, ScheduledItem, ScheduledKind,
};
pub use timers::{BulkScheduleResult, Scheduler, SchedulerStats};

/// Reasons a notification could not be scheduled
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("Scheduled time must be in the future")]
    NotInFuture,

    #[error("scheduledTime is required")]
    MissingTime,

    #[error("Invalid scheduledTime: {0}")]
    InvalidTime(String),

    /// A bulk element that is not a notification object
    #[error("Invalid notification: {0}")]
    InvalidItem(String),
}
