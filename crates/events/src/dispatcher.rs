//! Notification dispatch service.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes the notifications each event calls for. It is best-effort:
//! a failure is logged and the event is dropped, never retried, and the
//! mutation that published it is unaffected.

use taskforge_db::repositories::NotificationRepo;
use taskforge_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::notifications;

/// Background service that turns platform events into notification rows.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Run the dispatch loop until the bus is dropped.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let delivered = Self::dispatch(&pool, &event).await;
                    if delivered > 0 {
                        tracing::debug!(
                            event_type = %event.event_type,
                            delivered,
                            "Notifications dispatched"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Plan and insert notifications for one event. Returns how many rows
    /// were written.
    pub async fn dispatch(pool: &DbPool, event: &PlatformEvent) -> usize {
        let planned = match notifications::plan(event) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, event_type = %event.event_type, "Dropping event");
                return 0;
            }
        };

        let mut delivered = 0;
        for row in &planned {
            match NotificationRepo::create(pool, row).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::warn!(
                    error = %e,
                    event_type = %event.event_type,
                    recipient_id = row.recipient_id,
                    "Failed to store notification"
                ),
            }
        }
        delivered
    }
}
