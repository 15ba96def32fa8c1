//! Web Push delivery transport.
//!
//! The delivery engine only sees the [`PushTransport`] trait: one encrypted
//! payload to one subscription, success or a [`PushError`] carrying the push
//! service's status code. [`WebPushTransport`] is the production
//! implementation (RFC 8030 delivery, RFC 8291 encryption, RFC 8292 VAPID).

mod transport;
pub mod vapid;
mod webpush;

pub use transport::{PushError, PushTransport};
pub use vapid::{VapidError, VapidKeys};
pub use webpush::WebPushTransport;
