//! Task entity, attachments and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::status::{StatusId, TaskStatus};
use taskforge_core::task_graph::TaskPriority;
use taskforge_core::types::{DbId, Timestamp};

use crate::models::status::task_status;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<DbId>,
    pub created_by: DbId,
    #[serde(rename = "status", serialize_with = "task_status")]
    pub status_id: StatusId,
    pub priority: String,
    pub due_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub tags: Vec<String>,
    pub parent_task_id: Option<DbId>,
    pub dependencies: Vec<DbId>,
    pub completed_at: Option<Timestamp>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<DbId>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Full edit. A `status` here follows the same completion rules as a
/// status-only update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<DbId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
}

/// Status values to write together with a conditional update.
#[derive(Debug, Clone, Copy)]
pub struct StatusWrite {
    /// Status observed when the change was computed.
    pub expected: TaskStatus,
    pub next: TaskStatus,
    pub completed_at: Option<Timestamp>,
}

/// Which tasks a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskVisibility {
    All,
    AssignedTo(DbId),
    Department(DbId),
    /// Assigned to or created by the user.
    Involving(DbId),
}

#[derive(Debug, Clone)]
pub struct TaskListFilter {
    pub visibility: TaskVisibility,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// A row from the `task_attachments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskAttachment {
    pub id: DbId,
    pub task_id: DbId,
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub mimetype: String,
    pub uploaded_by: DbId,
    pub uploaded_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: DbId,
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub mimetype: String,
    pub uploaded_by: DbId,
}
