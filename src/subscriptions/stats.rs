//! Registry statistics

use serde::Serialize;

/// Subscription registry statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_subscriptions: usize,
    pub unique_endpoints: usize,
    pub dedupe_enabled: bool,
    pub total_added: u64,
    pub total_removed: u64,
}
