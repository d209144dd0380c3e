//! Handlers for the `/projects` resource and its members.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, DenyReason, ProjectScope, Resource};
use taskforge_core::error::{ConflictKind, CoreError};
use taskforge_core::roles::{permissions as perm, Role};
use taskforge_core::task_graph;
use taskforge_core::types::DbId;
use taskforge_db::models::project::{
    AddProjectMember, CreateProject, MemberRole, Project, ProjectMember, ProjectVisibility,
    ProjectWithMembers, UpdateProject,
};
use taskforge_db::repositories::ProjectRepo;

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::query::PageParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Project name must not be empty".into()).into());
    }
    Ok(())
}

/// POST /api/v1/projects
///
/// The manager becomes a LEAD member in the same transaction.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<ProjectWithMembers>>)> {
    validate_name(&input.name)?;
    task_graph::validate_hours("estimated_hours", input.estimated_hours)?;
    access::user_department(&state.pool, input.manager_id).await?;

    let scope = ProjectScope {
        department_id: input.department_id,
        manager_id: input.manager_id,
        member_ids: Vec::new(),
    };
    authorize(&user, Action::Create, &Resource::Project(scope))?;

    let project = ProjectRepo::create(&state.pool, &input).await?;
    let members = ProjectRepo::members(&state.pool, project.id).await?;
    tracing::info!(project_id = project.id, code = %project.code, user_id = user.id(), "Project created");

    let created = ProjectWithMembers { project, members };
    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::CREATE_PROJECT,
        entities::PROJECT,
        Some(created.project.id),
        AuditChanges::created(&created),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/projects
///
/// ADMIN sees everything; others see projects they manage or belong to,
/// and a MANAGER also every project in their department.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<Project>>>> {
    let principal = &user.principal;
    if !principal.has_permission(perm::PROJECT_READ) {
        return Err(CoreError::Denied(DenyReason::MissingPermission(perm::PROJECT_READ)).into());
    }
    let visibility = match (principal.role, principal.department_id) {
        (Role::Admin, _) => ProjectVisibility::All,
        (Role::Manager, Some(department_id)) => ProjectVisibility::DepartmentOrInvolving {
            department_id,
            user_id: principal.id,
        },
        _ => ProjectVisibility::Involving(principal.id),
    };

    let (page, limit, offset) = params.resolve();
    let items = ProjectRepo::list(&state.pool, visibility, limit, offset).await?;
    let total = ProjectRepo::count(&state.pool, visibility).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page,
            limit,
        },
    }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectWithMembers>>> {
    let (project, scope) = access::load_project(&state.pool, id).await?;
    authorize(&user, Action::Read, &Resource::Project(scope))?;
    let members = ProjectRepo::members(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ProjectWithMembers { project, members },
    }))
}

/// PUT /api/v1/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    task_graph::validate_hours("estimated_hours", input.estimated_hours)?;

    let (old, scope) = access::load_project(&state.pool, id).await?;
    authorize(&user, Action::Update, &Resource::Project(scope))?;

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Project", id))?;
    tracing::info!(project_id = id, user_id = user.id(), "Project updated");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_PROJECT,
        entities::PROJECT,
        Some(id),
        AuditChanges::updated(&old, &project),
    )
    .await?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (project, scope) = access::load_project(&state.pool, id).await?;
    authorize(&user, Action::Delete, &Resource::Project(scope))?;

    if !ProjectRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Project", id));
    }
    tracing::info!(project_id = id, user_id = user.id(), "Project deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_PROJECT,
        entities::PROJECT,
        Some(id),
        AuditChanges::deleted(&project),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/members
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ProjectMember>>>> {
    let (_, scope) = access::load_project(&state.pool, id).await?;
    authorize(&user, Action::Read, &Resource::Project(scope))?;
    let members = ProjectRepo::members(&state.pool, id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/projects/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<AddProjectMember>,
) -> AppResult<(StatusCode, Json<DataResponse<ProjectMember>>)> {
    let (_, project) = access::load_project(&state.pool, id).await?;
    let member_department_id = access::user_department(&state.pool, input.user_id).await?;
    authorize(
        &user,
        Action::AddMember,
        &Resource::ProjectMember {
            project,
            member_department_id,
        },
    )?;

    let member = ProjectRepo::add_member(
        &state.pool,
        id,
        input.user_id,
        input.role.unwrap_or(MemberRole::Member),
    )
    .await?
    .ok_or_else(|| {
        CoreError::conflict(
            ConflictKind::DuplicateMember,
            format!("User {} is already a member of project {id}", input.user_id),
        )
    })?;
    tracing::info!(project_id = id, member_id = input.user_id, "Project member added");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::ADD_PROJECT_MEMBER,
        entities::PROJECT,
        Some(id),
        AuditChanges::custom("addedMember", &member),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// DELETE /api/v1/projects/{id}/members/{user_id}
///
/// The project manager's own membership cannot be removed.
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path((id, member_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let (project, scope) = access::load_project(&state.pool, id).await?;
    let member_department_id = access::user_department(&state.pool, member_id).await?;
    authorize(
        &user,
        Action::RemoveMember,
        &Resource::ProjectMember {
            project: scope,
            member_department_id,
        },
    )?;

    if project.manager_id == member_id {
        return Err(CoreError::Validation("The project manager cannot be removed from the project".into()).into());
    }
    let removed = ProjectRepo::remove_member(&state.pool, id, member_id)
        .await?
        .ok_or(AppError::not_found("ProjectMember", member_id))?;
    tracing::info!(project_id = id, member_id, "Project member removed");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::REMOVE_PROJECT_MEMBER,
        entities::PROJECT,
        Some(id),
        AuditChanges::custom("removedMember", &removed),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
