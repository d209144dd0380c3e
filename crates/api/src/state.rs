use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::LocalFileStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: taskforge_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Publishes platform events; the notification dispatcher subscribes.
    pub event_bus: Arc<taskforge_events::EventBus>,
    /// Attachment byte storage.
    pub file_store: Arc<LocalFileStore>,
}

impl AppState {
    /// Publish an event. Never fails the calling mutation.
    pub fn publish(&self, event: taskforge_events::PlatformEvent) {
        self.event_bus.publish(event);
    }
}
