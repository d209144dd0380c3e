use serde::Serialize;
use sqlx::FromRow;
use taskforge_core::notification::{NotificationPriority, NotificationType, RelatedEntity};
use taskforge_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub sender_id: Option<DbId>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub priority: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient_id: DbId,
    pub sender_id: Option<DbId>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
    pub priority: NotificationPriority,
}
