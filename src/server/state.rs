use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::NotificationDispatcher;
use crate::push::{PushTransport, WebPushTransport};
use crate::scheduler::Scheduler;
use crate::subscriptions::SubscriptionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<SubscriptionRegistry>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub scheduler: Arc<Scheduler>,
    /// Whether the transport can sign and send (false when VAPID keys are unusable)
    pub transport_configured: bool,
    pub start_time: Instant,
}

impl AppState {
    /// Production state: Web Push transport built from the VAPID settings
    pub fn new(settings: Settings) -> Self {
        let transport = Arc::new(WebPushTransport::from_config(&settings.vapid, &settings.push));
        Self::with_transport(settings, transport)
    }

    /// State wired to an arbitrary transport
    pub fn with_transport(settings: Settings, transport: Arc<dyn PushTransport>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::with_dedupe(
            settings.push.dedupe_subscriptions,
        ));
        let transport_configured = transport.is_configured();
        let dispatcher = Arc::new(NotificationDispatcher::with_config(
            registry.clone(),
            transport,
            &settings.push,
        ));
        let scheduler = Arc::new(Scheduler::new(dispatcher.clone()));

        Self {
            settings: Arc::new(settings),
            registry,
            dispatcher,
            scheduler,
            transport_configured,
            start_time: Instant::now(),
        }
    }
}
