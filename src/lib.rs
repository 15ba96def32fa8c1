// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Core: registry, transport, delivery, scheduling
pub mod notification;
pub mod push;
pub mod scheduler;
pub mod subscriptions;

// HTTP layer
pub mod api;
pub mod server;
