//! Events that fan out into notifications.
//!
//! Handlers build events with the constructors here so the payload shape
//! always matches what [`plan`] expects. Recipient resolution happens when
//! the event is planned, from ids carried in the payload.

use serde::{Deserialize, Serialize};
use taskforge_core::audit::entities;
use taskforge_core::notification::{
    self as rules, NotificationPriority, NotificationType, RelatedEntity,
};
use taskforge_core::types::DbId;
use taskforge_db::models::notification::CreateNotification;

use crate::bus::PlatformEvent;

pub mod event_types {
    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const COMMENT_CREATED: &str = "comment.created";
    pub const NOTIFICATION_REQUESTED: &str = "notification.requested";
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Malformed {event_type} payload: {source}")]
    MalformedPayload {
        event_type: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssigned {
    pub task_id: DbId,
    pub title: String,
    pub assignee_id: DbId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: DbId,
    pub title: String,
    pub project_manager_id: DbId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreated {
    pub task_id: DbId,
    pub comment_id: DbId,
    pub title: String,
    pub assignee_id: Option<DbId>,
    pub creator_id: DbId,
}

/// An explicit `NOTIFY(recipients, type, entity)` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequested {
    pub recipient_ids: Vec<DbId>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub priority: NotificationPriority,
}

// ---------------------------------------------------------------------------
// Event constructors
// ---------------------------------------------------------------------------

fn event<T: Serialize>(event_type: &str, entity_type: &str, entity_id: DbId, actor_id: DbId, payload: &T) -> PlatformEvent {
    PlatformEvent::new(event_type)
        .with_source(entity_type, entity_id)
        .with_actor(actor_id)
        .with_payload(serde_json::to_value(payload).unwrap_or_default())
}

pub fn task_assigned(actor_id: DbId, payload: &TaskAssigned) -> PlatformEvent {
    event(event_types::TASK_ASSIGNED, entities::TASK, payload.task_id, actor_id, payload)
}

pub fn task_completed(actor_id: DbId, payload: &TaskCompleted) -> PlatformEvent {
    event(event_types::TASK_COMPLETED, entities::TASK, payload.task_id, actor_id, payload)
}

pub fn comment_created(actor_id: DbId, payload: &CommentCreated) -> PlatformEvent {
    event(event_types::COMMENT_CREATED, entities::COMMENT, payload.comment_id, actor_id, payload)
}

pub fn notification_requested(actor_id: DbId, payload: &NotificationRequested) -> PlatformEvent {
    PlatformEvent::new(event_types::NOTIFICATION_REQUESTED)
        .with_actor(actor_id)
        .with_payload(serde_json::to_value(payload).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

fn parse<T: for<'de> Deserialize<'de>>(event: &PlatformEvent) -> Result<T, PlanError> {
    serde_json::from_value(event.payload.clone()).map_err(|source| PlanError::MalformedPayload {
        event_type: event.event_type.clone(),
        source,
    })
}

/// Turn one event into the notification rows it should produce.
///
/// Events this module does not know about yield nothing. Only comments
/// skip their author; assignment and completion reach their recipient even
/// when that is the acting user.
pub fn plan(event: &PlatformEvent) -> Result<Vec<CreateNotification>, PlanError> {
    let sender_id = event.actor_id;

    let rows = match event.event_type.as_str() {
        event_types::TASK_ASSIGNED => {
            let p: TaskAssigned = parse(event)?;
            let (title, message) = rules::task_assigned_message(&p.title);
            build(
                vec![p.assignee_id],
                sender_id,
                NotificationType::TaskAssigned,
                &title,
                &message,
                Some(RelatedEntity::task(p.task_id)),
                NotificationPriority::Normal,
            )
        }
        event_types::TASK_COMPLETED => {
            let p: TaskCompleted = parse(event)?;
            let (title, message) = rules::task_completed_message(&p.title);
            build(
                vec![p.project_manager_id],
                sender_id,
                NotificationType::TaskCompleted,
                &title,
                &message,
                Some(RelatedEntity::task(p.task_id)),
                NotificationPriority::Normal,
            )
        }
        event_types::COMMENT_CREATED => {
            let p: CommentCreated = parse(event)?;
            let (title, message) = rules::comment_message(&p.title);
            let recipients = match sender_id {
                Some(author_id) => rules::comment_recipients(p.assignee_id, p.creator_id, author_id),
                None => rules::dedup_excluding(p.assignee_id.into_iter().chain([p.creator_id]), None),
            };
            build(
                recipients,
                sender_id,
                NotificationType::Comment,
                &title,
                &message,
                Some(RelatedEntity::task(p.task_id)),
                NotificationPriority::Normal,
            )
        }
        event_types::NOTIFICATION_REQUESTED => {
            let p: NotificationRequested = parse(event)?;
            build(
                rules::dedup_excluding(p.recipient_ids, None),
                sender_id,
                p.kind,
                &p.title,
                &p.message,
                p.related_entity,
                p.priority,
            )
        }
        _ => Vec::new(),
    };
    Ok(rows)
}

fn build(
    recipients: Vec<DbId>,
    sender_id: Option<DbId>,
    kind: NotificationType,
    title: &str,
    message: &str,
    related_entity: Option<RelatedEntity>,
    priority: NotificationPriority,
) -> Vec<CreateNotification> {
    recipients
        .into_iter()
        .map(|recipient_id| CreateNotification {
            recipient_id,
            sender_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            related_entity: related_entity.clone(),
            priority,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients(rows: &[CreateNotification]) -> Vec<DbId> {
        rows.iter().map(|n| n.recipient_id).collect()
    }

    #[test]
    fn assignment_notifies_assignee() {
        let event = task_assigned(
            1,
            &TaskAssigned {
                task_id: 10,
                title: "Ship".into(),
                assignee_id: 2,
            },
        );
        let rows = plan(&event).unwrap();
        assert_eq!(recipients(&rows), vec![2]);
        assert_eq!(rows[0].kind, NotificationType::TaskAssigned);
        assert_eq!(rows[0].sender_id, Some(1));
        assert_eq!(rows[0].related_entity, Some(RelatedEntity::task(10)));
    }

    #[test]
    fn self_assignment_still_notifies_assignee() {
        let event = task_assigned(
            2,
            &TaskAssigned {
                task_id: 10,
                title: "Ship".into(),
                assignee_id: 2,
            },
        );
        let rows = plan(&event).unwrap();
        assert_eq!(recipients(&rows), vec![2]);
        assert_eq!(rows[0].sender_id, Some(2));
    }

    #[test]
    fn manager_completing_own_task_is_notified() {
        let event = task_completed(
            3,
            &TaskCompleted {
                task_id: 10,
                title: "Ship".into(),
                project_manager_id: 3,
            },
        );
        assert_eq!(recipients(&plan(&event).unwrap()), vec![3]);
    }

    #[test]
    fn completion_notifies_project_manager() {
        let event = task_completed(
            5,
            &TaskCompleted {
                task_id: 10,
                title: "Ship".into(),
                project_manager_id: 3,
            },
        );
        let rows = plan(&event).unwrap();
        assert_eq!(recipients(&rows), vec![3]);
        assert_eq!(rows[0].title, "Task completed");
    }

    #[test]
    fn comment_notifies_assignee_and_creator_except_author() {
        let payload = CommentCreated {
            task_id: 10,
            comment_id: 99,
            title: "Ship".into(),
            assignee_id: Some(4),
            creator_id: 3,
        };
        assert_eq!(recipients(&plan(&comment_created(4, &payload)).unwrap()), vec![3]);
        assert_eq!(recipients(&plan(&comment_created(8, &payload)).unwrap()), vec![4, 3]);
    }

    #[test]
    fn explicit_request_deduplicates_recipients() {
        let event = notification_requested(
            1,
            &NotificationRequested {
                recipient_ids: vec![5, 6, 5],
                kind: NotificationType::System,
                title: "Maintenance".into(),
                message: "Tonight at 22:00".into(),
                related_entity: None,
                priority: NotificationPriority::High,
            },
        );
        let rows = plan(&event).unwrap();
        assert_eq!(recipients(&rows), vec![5, 6]);
        assert_eq!(rows[1].priority, NotificationPriority::High);
    }

    #[test]
    fn unknown_events_plan_nothing() {
        assert!(plan(&PlatformEvent::new("task.deleted")).unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let event = PlatformEvent::new(event_types::TASK_ASSIGNED)
            .with_payload(serde_json::json!({"task_id": "x"}));
        assert!(matches!(plan(&event), Err(PlanError::MalformedPayload { .. })));
    }
}
