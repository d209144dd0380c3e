//! Taskforge event bus and notification dispatch.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope handlers publish after a
//!   mutation commits.
//! - [`notifications`]: the events that produce notifications, their
//!   payloads, and recipient resolution.
//! - [`NotificationDispatcher`]: background service turning those events
//!   into `notifications` rows. Failures are logged, never propagated.

pub mod bus;
pub mod dispatcher;
pub mod notifications;

pub use bus::{EventBus, PlatformEvent};
pub use dispatcher::NotificationDispatcher;
