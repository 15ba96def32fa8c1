//! Notification payloads and the fan-out delivery engine.

mod dispatcher;
mod types;

pub use dispatcher::{
    DeliveryError, DeliveryOutcome, DeliveryReport, DeliveryTrigger, DispatcherStats,
    DispatcherStatsSnapshot, NotificationDispatcher, RecipientOutcome,
};
pub use types::{NotificationBuilder, NotificationPayload, PayloadDefaults, DEFAULT_ICON};
