use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics::SubscriptionMetrics;

use super::stats::RegistryStats;
use super::types::{AddOutcome, PushSubscription, SubscriptionHandle, SubscriptionSummary};

/// In-memory set of push subscriptions.
///
/// Mutated concurrently by HTTP handlers (subscribe/unsubscribe) and by
/// delivery rounds (pruning). The endpoint index is always locked before
/// the entry map, never the other way around.
pub struct SubscriptionRegistry {
    /// entry_id -> SubscriptionHandle
    entries: DashMap<Uuid, Arc<SubscriptionHandle>>,
    /// endpoint -> entry ids (more than one only when dedupe is off)
    endpoint_index: DashMap<String, Vec<Uuid>>,
    next_seq: AtomicU64,
    dedupe: bool,
    total_added: AtomicU64,
    total_removed: AtomicU64,
}

impl SubscriptionRegistry {
    /// Registry that treats the endpoint as a unique key
    pub fn new() -> Self {
        Self::with_dedupe(true)
    }

    /// Registry with explicit endpoint uniqueness policy.
    ///
    /// With `dedupe = false` every subscribe call appends a new entry, so a
    /// client that subscribes twice receives each notification twice.
    pub fn with_dedupe(dedupe: bool) -> Self {
        Self {
            entries: DashMap::new(),
            endpoint_index: DashMap::new(),
            next_seq: AtomicU64::new(0),
            dedupe,
            total_added: AtomicU64::new(0),
            total_removed: AtomicU64::new(0),
        }
    }

    pub fn dedupe_enabled(&self) -> bool {
        self.dedupe
    }

    /// Add a subscription
    pub fn add(&self, subscription: PushSubscription) -> AddOutcome {
        let endpoint = subscription.endpoint.clone();
        let mut ids = self.endpoint_index.entry(endpoint.clone()).or_default();

        if self.dedupe {
            let existing = ids
                .first()
                .and_then(|id| self.entries.get(id).map(|h| h.value().clone()));

            if let Some(existing) = existing {
                let replaced = Arc::new(existing.with_subscription(subscription));
                self.entries.insert(replaced.id, replaced);
                tracing::debug!(endpoint = %endpoint, "Subscription keys replaced");
                return AddOutcome::Replaced;
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(SubscriptionHandle::new(seq, subscription));
        ids.push(handle.id);
        self.entries.insert(handle.id, handle.clone());
        drop(ids);

        self.total_added.fetch_add(1, Ordering::Relaxed);
        SubscriptionMetrics::record_added();
        SubscriptionMetrics::set_active(self.entries.len());

        tracing::info!(entry_id = %handle.id, endpoint = %endpoint, "Subscription registered");

        AddOutcome::Inserted
    }

    /// Remove every entry with the given endpoint; returns how many were removed
    pub fn remove_by_endpoint(&self, endpoint: &str) -> usize {
        let Some((_, ids)) = self.endpoint_index.remove(endpoint) else {
            return 0;
        };

        let removed = ids
            .iter()
            .filter(|id| self.entries.remove(id).is_some())
            .count();

        if removed > 0 {
            self.total_removed.fetch_add(removed as u64, Ordering::Relaxed);
            SubscriptionMetrics::record_removed(removed as u64);
            SubscriptionMetrics::set_active(self.entries.len());
            tracing::info!(endpoint = %endpoint, removed = removed, "Subscription removed");
        }

        removed
    }

    /// Snapshot of all entries in subscribe order
    pub fn snapshot(&self) -> Vec<Arc<SubscriptionHandle>> {
        let mut handles: Vec<_> = self.entries.iter().map(|r| r.value().clone()).collect();
        handles.sort_by_key(|h| h.seq);
        handles
    }

    /// All subscriptions in subscribe order
    pub fn list(&self) -> Vec<PushSubscription> {
        self.snapshot()
            .into_iter()
            .map(|h| h.subscription.clone())
            .collect()
    }

    /// Endpoint-only listing in subscribe order
    pub fn list_redacted(&self) -> Vec<SubscriptionSummary> {
        self.snapshot()
            .iter()
            .map(|h| h.subscription.summary())
            .collect()
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.endpoint_index.contains_key(endpoint)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_subscriptions: self.entries.len(),
            unique_endpoints: self.endpoint_index.len(),
            dedupe_enabled: self.dedupe,
            total_added: self.total_added.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(endpoint: &str) -> PushSubscription {
        PushSubscription::new(endpoint, "p256dh", "auth")
    }

    #[test]
    fn test_add_and_list_in_insertion_order() {
        let registry = SubscriptionRegistry::new();
        registry.add(sub("https://push.example.com/c"));
        registry.add(sub("https://push.example.com/a"));
        registry.add(sub("https://push.example.com/b"));

        let endpoints: Vec<_> = registry.list().into_iter().map(|s| s.endpoint).collect();
        assert_eq!(
            endpoints,
            vec![
                "https://push.example.com/c",
                "https://push.example.com/a",
                "https://push.example.com/b",
            ]
        );
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_dedupe_replaces_keys_in_place() {
        let registry = SubscriptionRegistry::new();
        registry.add(sub("https://push.example.com/1"));
        registry.add(sub("https://push.example.com/2"));

        let outcome = registry.add(PushSubscription::new(
            "https://push.example.com/1",
            "new-p256dh",
            "new-auth",
        ));
        assert_eq!(outcome, AddOutcome::Replaced);
        assert_eq!(registry.count(), 2);

        let list = registry.list();
        assert_eq!(list[0].endpoint, "https://push.example.com/1");
        assert_eq!(list[0].keys.p256dh, "new-p256dh");
        assert_eq!(list[1].endpoint, "https://push.example.com/2");
    }

    #[test]
    fn test_without_dedupe_duplicates_are_kept() {
        let registry = SubscriptionRegistry::with_dedupe(false);
        assert_eq!(registry.add(sub("https://push.example.com/1")), AddOutcome::Inserted);
        assert_eq!(registry.add(sub("https://push.example.com/1")), AddOutcome::Inserted);
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.stats().unique_endpoints, 1);

        // Removal drops every duplicate
        assert_eq!(registry.remove_by_endpoint("https://push.example.com/1"), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_endpoint_is_noop() {
        let registry = SubscriptionRegistry::new();
        registry.add(sub("https://push.example.com/1"));

        assert_eq!(registry.remove_by_endpoint("https://push.example.com/missing"), 0);
        assert_eq!(registry.count(), 1);
        assert!(registry.contains("https://push.example.com/1"));
    }

    #[test]
    fn test_list_redacted_matches_order() {
        let registry = SubscriptionRegistry::new();
        registry.add(sub("https://push.example.com/1"));
        registry.add(sub("https://push.example.com/2"));

        let redacted = registry.list_redacted();
        assert_eq!(redacted.len(), 2);
        assert_eq!(redacted[0].endpoint, "https://push.example.com/1");
        assert_eq!(redacted[1].endpoint, "https://push.example.com/2");
    }

    #[test]
    fn test_stats() {
        let registry = SubscriptionRegistry::new();
        registry.add(sub("https://push.example.com/1"));
        registry.add(sub("https://push.example.com/2"));
        registry.remove_by_endpoint("https://push.example.com/1");

        let stats = registry.stats();
        assert_eq!(stats.total_subscriptions, 1);
        assert_eq!(stats.unique_endpoints, 1);
        assert_eq!(stats.total_added, 2);
        assert_eq!(stats.total_removed, 1);
        assert!(stats.dedupe_enabled);
    }

    #[test]
    fn test_concurrent_add_and_remove() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let endpoint = format!("https://push.example.com/{}/{}", t, i);
                        registry.add(sub(&endpoint));
                        if i % 2 == 0 {
                            registry.remove_by_endpoint(&endpoint);
                        }
                    }
                })
            })
            .collect();

        for handle in threads {
            handle.join().unwrap();
        }

        assert_eq!(registry.count(), 8 * 25);
        assert_eq!(registry.list().len(), 8 * 25);
    }
}
