//! `POST /api/v1/authz/check`: ask the authorization engine whether the
//! caller may perform an action, without performing it.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use taskforge_core::authz::{self as engine, Action, DenyReason, Decision, Resource, ResourceKind};
use taskforge_core::error::CoreError;
use taskforge_core::types::DbId;
use taskforge_db::repositories::{AttachmentRepo, DepartmentRepo, TimeLogRepo};
use taskforge_db::DbPool;

use crate::access;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    /// Target user for `ProjectMember` and `TeamMember` checks.
    pub member_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

/// POST /api/v1/authz/check
///
/// A missing entity is reported as 404, never as a denial.
pub async fn check(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CheckRequest>,
) -> AppResult<Json<DataResponse<CheckResponse>>> {
    let action = Action::parse(&input.action)?;
    let kind = ResourceKind::parse(&input.entity_type)?;
    let resource = load_resource(&state.pool, kind, input.entity_id, input.member_id).await?;

    let decision = engine::authorize(&user.principal, action, &resource);
    tracing::debug!(
        user_id = user.id(),
        action = action.as_str(),
        entity_type = kind.as_str(),
        entity_id = ?input.entity_id,
        ?decision,
        "Authorization check"
    );
    let data = match decision {
        Decision::Allow => CheckResponse {
            allowed: true,
            reason: None,
        },
        Decision::Deny(reason) => CheckResponse {
            allowed: false,
            reason: Some(reason),
        },
    };
    Ok(Json(DataResponse { data }))
}

fn required(kind: ResourceKind, id: Option<DbId>, field: &str) -> AppResult<DbId> {
    id.ok_or_else(|| AppError::Core(CoreError::Validation(format!("{field} is required for {}", kind.as_str()))))
}

async fn load_resource(
    pool: &DbPool,
    kind: ResourceKind,
    entity_id: Option<DbId>,
    member_id: Option<DbId>,
) -> AppResult<Resource> {
    let resource = match kind {
        ResourceKind::Department => {
            if let Some(id) = entity_id {
                DepartmentRepo::find_by_id(pool, id)
                    .await?
                    .ok_or(AppError::not_found("Department", id))?;
            }
            Resource::Department { id: entity_id }
        }
        ResourceKind::Project => {
            let (_, scope) = access::load_project(pool, required(kind, entity_id, "entity_id")?).await?;
            Resource::Project(scope)
        }
        ResourceKind::ProjectMember => {
            let (_, project) = access::load_project(pool, required(kind, entity_id, "entity_id")?).await?;
            let member_department_id = access::user_department(pool, required(kind, member_id, "member_id")?).await?;
            Resource::ProjectMember {
                project,
                member_department_id,
            }
        }
        ResourceKind::Task => {
            let (_, scope) = access::load_task(pool, required(kind, entity_id, "entity_id")?).await?;
            Resource::Task(scope)
        }
        ResourceKind::Attachment => {
            let id = required(kind, entity_id, "entity_id")?;
            let attachment = AttachmentRepo::find_by_id(pool, id)
                .await?
                .ok_or(AppError::not_found("Attachment", id))?;
            let (_, task) = access::load_task(pool, attachment.task_id).await?;
            Resource::Attachment {
                task,
                uploaded_by: attachment.uploaded_by,
            }
        }
        ResourceKind::Document => {
            let (_, project) = access::load_document(pool, required(kind, entity_id, "entity_id")?).await?;
            Resource::Document(project)
        }
        ResourceKind::TimeLog => {
            let id = required(kind, entity_id, "entity_id")?;
            let log = TimeLogRepo::find_by_id(pool, id)
                .await?
                .ok_or(AppError::not_found("TimeLog", id))?;
            let (_, task) = access::load_task(pool, log.task_id).await?;
            Resource::TimeLog {
                owner_id: log.user_id,
                task,
            }
        }
        ResourceKind::Team => {
            let (_, scope) = access::load_team(pool, required(kind, entity_id, "entity_id")?).await?;
            Resource::Team(scope)
        }
        ResourceKind::TeamMember => {
            let (_, team) = access::load_team(pool, required(kind, entity_id, "entity_id")?).await?;
            let member_department_id = access::user_department(pool, required(kind, member_id, "member_id")?).await?;
            Resource::TeamMember {
                team,
                member_department_id,
            }
        }
        ResourceKind::AuditLog => Resource::AuditLog,
    };
    Ok(resource)
}
