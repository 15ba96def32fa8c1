//! Subscription registry: the set of browser push endpoints notifications fan out to.

mod registry;
mod stats;
mod types;

pub use registry::SubscriptionRegistry;
pub use stats::RegistryStats;
pub use types::{
    AddOutcome, PushSubscription, SubscriptionHandle, SubscriptionKeys, SubscriptionSummary,
};
