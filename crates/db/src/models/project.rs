//! Project entity, membership rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::status::{ProjectStatus, StatusId};
use taskforge_core::task_graph::TaskPriority;
use taskforge_core::types::{DbId, Timestamp};

use crate::models::status::project_status;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub manager_id: DbId,
    pub department_id: Option<DbId>,
    #[serde(rename = "status", serialize_with = "project_status")]
    pub status_id: StatusId,
    pub priority: String,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Lead,
    Member,
    Viewer,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "LEAD",
            Self::Member => "MEMBER",
            Self::Viewer => "VIEWER",
        }
    }
}

/// A row from the `project_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectMember {
    pub project_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub added_at: Timestamp,
}

/// Project with its member list, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

/// DTO for creating a project. The manager becomes a LEAD member.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    /// Generated as `PROJ-NNNN` when omitted; stored uppercase.
    pub code: Option<String>,
    pub description: Option<String>,
    pub manager_id: DbId,
    pub department_id: Option<DbId>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
}

/// DTO for updating a project. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddProjectMember {
    pub user_id: DbId,
    pub role: Option<MemberRole>,
}

/// Which projects a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectVisibility {
    All,
    /// Projects the user manages or is a member of.
    Involving(DbId),
    /// Projects in the department plus ones the user is involved in.
    DepartmentOrInvolving { department_id: DbId, user_id: DbId },
}
