//! Notification types, recipient resolution and message text.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    TaskAssigned,
    TaskUpdated,
    TaskCompleted,
    Comment,
    Mention,
    ProjectUpdate,
    System,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskAssigned => "TASK_ASSIGNED",
            Self::TaskUpdated => "TASK_UPDATED",
            Self::TaskCompleted => "TASK_COMPLETED",
            Self::Comment => "COMMENT",
            Self::Mention => "MENTION",
            Self::ProjectUpdate => "PROJECT_UPDATE",
            Self::System => "SYSTEM",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        serde_json::from_value(serde_json::Value::String(value.to_string()))
            .map_err(|_| CoreError::Validation(format!("Unknown notification type '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
        }
    }
}

/// Entity a notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub entity_id: DbId,
}

impl RelatedEntity {
    pub fn task(id: DbId) -> Self {
        Self {
            entity_type: "Task".to_string(),
            entity_id: id,
        }
    }
}

pub const VALID_RELATED_ENTITY_TYPES: &[&str] = &["Task", "Project", "User", "Comment"];

pub fn validate_related_entity(entity: &RelatedEntity) -> Result<(), CoreError> {
    if VALID_RELATED_ENTITY_TYPES.contains(&entity.entity_type.as_str()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid related entity type '{}'. Must be one of: {}",
            entity.entity_type,
            VALID_RELATED_ENTITY_TYPES.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Assignee and creator of the task, minus the comment author, without
/// duplicates.
pub fn comment_recipients(assignee_id: Option<DbId>, creator_id: DbId, author_id: DbId) -> Vec<DbId> {
    dedup_excluding([assignee_id, Some(creator_id)].into_iter().flatten(), Some(author_id))
}

/// Order-preserving de-duplication, optionally dropping one id.
pub fn dedup_excluding<I>(ids: I, exclude: Option<DbId>) -> Vec<DbId>
where
    I: IntoIterator<Item = DbId>,
{
    let mut out: Vec<DbId> = Vec::new();
    for id in ids {
        if Some(id) != exclude && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Message text
// ---------------------------------------------------------------------------

pub fn task_assigned_message(task_title: &str) -> (String, String) {
    (
        "New task assigned".to_string(),
        format!("\"{task_title}\" was assigned to you"),
    )
}

pub fn task_completed_message(task_title: &str) -> (String, String) {
    (
        "Task completed".to_string(),
        format!("\"{task_title}\" was marked as done"),
    )
}

pub fn comment_message(task_title: &str) -> (String, String) {
    (
        "New comment".to_string(),
        format!("A comment was left on \"{task_title}\""),
    )
}
