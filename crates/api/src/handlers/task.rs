//! Handlers for the `/tasks` resource: CRUD, status, hierarchy and
//! dependencies.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, DenyReason, Resource, TaskScope};
use taskforge_core::error::{ConflictKind, CoreError};
use taskforge_core::roles::{permissions as perm, Role};
use taskforge_core::status::TaskStatus;
use taskforge_core::task_graph::{self, TaskPriority};
use taskforge_core::types::DbId;
use taskforge_db::models::task::{CreateTask, StatusWrite, Task, TaskListFilter, TaskVisibility, UpdateTask};
use taskforge_db::repositories::TaskRepo;
use taskforge_db::DbPool;
use taskforge_events::notifications::{self, TaskAssigned, TaskCompleted};

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::query::PageParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct SubtaskLink {
    pub subtask_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct DependencyLink {
    pub dependency_id: DbId,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateTask>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    task_graph::validate_title(&input.title)?;
    task_graph::validate_hours("estimated_hours", input.estimated_hours)?;

    let (_, project) = access::load_project(&state.pool, input.project_id).await?;
    let scope = TaskScope {
        project,
        assignee_id: input.assigned_to,
        creator_id: user.id(),
    };
    authorize(&user, Action::Create, &Resource::Task(scope))?;
    if let Some(assignee_id) = input.assigned_to {
        access::user_department(&state.pool, assignee_id).await?;
    }

    let task = TaskRepo::create(&state.pool, user.id(), &input).await?;
    tracing::info!(task_id = task.id, project_id = task.project_id, user_id = user.id(), "Task created");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::CREATE_TASK,
        entities::TASK,
        Some(task.id),
        AuditChanges::created(&task),
    )
    .await?;

    if let Some(assignee_id) = task.assigned_to {
        publish_assigned(&state, &user, &task, assignee_id);
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks
///
/// ADMIN sees every task, a MANAGER the tasks of their department's
/// projects, a USER only tasks assigned to them.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<DataResponse<Page<Task>>>> {
    let principal = &user.principal;
    if !principal.has_permission(perm::TASK_READ) {
        return Err(CoreError::Denied(DenyReason::MissingPermission(perm::TASK_READ)).into());
    }

    let visibility = match (principal.role, principal.department_id) {
        (Role::Admin, _) => TaskVisibility::All,
        (Role::Manager, Some(department_id)) => TaskVisibility::Department(department_id),
        (Role::Manager, None) => TaskVisibility::Involving(principal.id),
        (Role::User, _) => TaskVisibility::AssignedTo(principal.id),
    };
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let filter = TaskListFilter {
        visibility,
        status: params.status,
        priority: params.priority,
        project_id: params.project_id,
        assigned_to: params.assigned_to,
        search: params.search.filter(|s| !s.trim().is_empty()),
        limit,
        offset,
    };

    let items = TaskRepo::list(&state.pool, &filter).await?;
    let total = TaskRepo::count(&state.pool, &filter).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page,
            limit,
        },
    }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (task, scope) = access::load_task(&state.pool, id).await?;
    authorize(&user, Action::Read, &Resource::Task(scope))?;
    Ok(Json(DataResponse { data: task }))
}

/// PUT /api/v1/tasks/{id}
///
/// Full edit. A `status` in the body follows the same completion rules as
/// the status endpoint.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTask>,
) -> AppResult<Json<DataResponse<Task>>> {
    if let Some(title) = &input.title {
        task_graph::validate_title(title)?;
    }
    task_graph::validate_hours("estimated_hours", input.estimated_hours)?;

    let (old, scope) = access::load_task(&state.pool, id).await?;
    let manager_id = scope.project.manager_id;
    authorize(&user, Action::Update, &Resource::Task(scope))?;
    if let Some(assignee_id) = input.assigned_to {
        access::user_department(&state.pool, assignee_id).await?;
    }

    let current = TaskStatus::from_id(old.status_id)?;
    let next = input.status.unwrap_or(current);
    let write = StatusWrite {
        expected: current,
        next,
        completed_at: task_graph::apply_status(current, old.completed_at, next, chrono::Utc::now())?,
    };

    let task = match TaskRepo::update(&state.pool, id, &input, write).await? {
        Some(task) => task,
        None => return Err(stale_or_missing(&state.pool, id).await),
    };
    tracing::info!(task_id = id, user_id = user.id(), "Task updated");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_TASK,
        entities::TASK,
        Some(id),
        AuditChanges::updated(&old, &task),
    )
    .await?;

    if let Some(assignee_id) = task.assigned_to.filter(|a| old.assigned_to != Some(*a)) {
        publish_assigned(&state, &user, &task, assignee_id);
    }
    if task_graph::is_completion(current, next) {
        publish_completed(&state, &user, &task, manager_id);
    }

    Ok(Json(DataResponse { data: task }))
}

/// PATCH /api/v1/tasks/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChange>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (old, scope) = access::load_task(&state.pool, id).await?;
    let manager_id = scope.project.manager_id;
    authorize(&user, Action::UpdateStatus, &Resource::Task(scope))?;

    let current = TaskStatus::from_id(old.status_id)?;
    let write = StatusWrite {
        expected: current,
        next: input.status,
        completed_at: task_graph::apply_status(current, old.completed_at, input.status, chrono::Utc::now())?,
    };

    let task = match TaskRepo::update_status(&state.pool, id, write).await? {
        Some(task) => task,
        None => return Err(stale_or_missing(&state.pool, id).await),
    };
    tracing::info!(task_id = id, from = %current, to = %input.status, user_id = user.id(), "Task status changed");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_TASK_STATUS,
        entities::TASK,
        Some(id),
        AuditChanges::updated(&json!({ "status": current }), &json!({ "status": input.status })),
    )
    .await?;

    if task_graph::is_completion(current, input.status) {
        publish_completed(&state, &user, &task, manager_id);
    }

    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/tasks/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (task, scope) = access::load_task(&state.pool, id).await?;
    authorize(&user, Action::Delete, &Resource::Task(scope))?;

    if !TaskRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Task", id));
    }
    tracing::info!(task_id = id, user_id = user.id(), "Task deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_TASK,
        entities::TASK,
        Some(id),
        AuditChanges::deleted(&task),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks/{id}/subtasks
pub async fn list_subtasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    let (_, scope) = access::load_task(&state.pool, id).await?;
    authorize(&user, Action::Read, &Resource::Task(scope))?;
    let subtasks = TaskRepo::subtasks(&state.pool, id).await?;
    Ok(Json(DataResponse { data: subtasks }))
}

/// POST /api/v1/tasks/{id}/subtasks
///
/// Makes `subtask_id` a child of `{id}`, replacing any previous parent.
pub async fn add_subtask(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<SubtaskLink>,
) -> AppResult<Json<DataResponse<Task>>> {
    task_graph::validate_parent(input.subtask_id, id, &[])?;
    let (_, parent_scope) = access::load_task(&state.pool, id).await?;
    let (child, child_scope) = access::load_task(&state.pool, input.subtask_id).await?;
    authorize(&user, Action::ManageHierarchy, &Resource::Task(parent_scope))?;
    authorize(&user, Action::ManageHierarchy, &Resource::Task(child_scope))?;

    let linked = TaskRepo::set_parent(&state.pool, input.subtask_id, id).await?;
    tracing::info!(parent_id = id, subtask_id = input.subtask_id, "Subtask linked");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::ADD_SUBTASK,
        entities::TASK,
        Some(id),
        AuditChanges::custom(
            "addedSubtask",
            &json!({ "subtaskId": input.subtask_id, "previousParentId": child.parent_task_id }),
        ),
    )
    .await?;

    Ok(Json(DataResponse { data: linked }))
}

/// DELETE /api/v1/tasks/{id}/subtasks/{subtask_id}
///
/// Idempotent: unlinking a task that is not a child of `{id}` returns it
/// unchanged and records nothing.
pub async fn remove_subtask(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path((id, subtask_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (_, parent_scope) = access::load_task(&state.pool, id).await?;
    let (child, child_scope) = access::load_task(&state.pool, subtask_id).await?;
    authorize(&user, Action::ManageHierarchy, &Resource::Task(parent_scope))?;
    authorize(&user, Action::ManageHierarchy, &Resource::Task(child_scope))?;

    if child.parent_task_id != Some(id) {
        return Ok(Json(DataResponse { data: child }));
    }

    let unlinked = TaskRepo::remove_parent(&state.pool, subtask_id)
        .await?
        .ok_or(AppError::not_found("Task", subtask_id))?;

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::REMOVE_SUBTASK,
        entities::TASK,
        Some(id),
        AuditChanges::custom("removedSubtask", &json!({ "subtaskId": subtask_id })),
    )
    .await?;

    Ok(Json(DataResponse { data: unlinked }))
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/dependencies
pub async fn add_dependency(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<DependencyLink>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (_, scope) = access::load_task(&state.pool, id).await?;
    let (_, target_scope) = access::load_task(&state.pool, input.dependency_id).await?;
    authorize(&user, Action::ManageDependencies, &Resource::Task(scope))?;
    authorize(&user, Action::Read, &Resource::Task(target_scope))?;

    let task = TaskRepo::add_dependency(
        &state.pool,
        id,
        input.dependency_id,
        state.config.reject_dependency_cycles,
    )
    .await?;
    tracing::info!(task_id = id, dependency_id = input.dependency_id, "Dependency added");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::ADD_DEPENDENCY,
        entities::TASK,
        Some(id),
        AuditChanges::custom("addedDependency", &json!({ "dependencyId": input.dependency_id })),
    )
    .await?;

    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/tasks/{id}/dependencies/{dependency_id}
///
/// Idempotent; only an actual removal is audited.
pub async fn remove_dependency(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path((id, dependency_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Task>>> {
    let (before, scope) = access::load_task(&state.pool, id).await?;
    authorize(&user, Action::ManageDependencies, &Resource::Task(scope))?;

    let task = TaskRepo::remove_dependency(&state.pool, id, dependency_id)
        .await?
        .ok_or(AppError::not_found("Task", id))?;

    if before.dependencies.contains(&dependency_id) {
        AuditRecorder::record(
            &state.pool,
            &AuditActor::new(&user, &client),
            actions::REMOVE_DEPENDENCY,
            entities::TASK,
            Some(id),
            AuditChanges::custom("removedDependency", &json!({ "dependencyId": dependency_id })),
        )
        .await?;
    }

    Ok(Json(DataResponse { data: task }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A guarded write matched no row: either the task vanished or its status
/// moved since it was read.
async fn stale_or_missing(pool: &DbPool, id: DbId) -> AppError {
    match TaskRepo::find_by_id(pool, id).await {
        Ok(Some(_)) => CoreError::conflict(
            ConflictKind::ConcurrentUpdate,
            format!("Task {id} was modified concurrently; reload and retry"),
        )
        .into(),
        Ok(None) => AppError::not_found("Task", id),
        Err(e) => e.into(),
    }
}

fn publish_assigned(state: &AppState, user: &AuthUser, task: &Task, assignee_id: DbId) {
    state.publish(notifications::task_assigned(
        user.id(),
        &TaskAssigned {
            task_id: task.id,
            title: task.title.clone(),
            assignee_id,
        },
    ));
}

fn publish_completed(state: &AppState, user: &AuthUser, task: &Task, project_manager_id: DbId) {
    state.publish(notifications::task_completed(
        user.id(),
        &TaskCompleted {
            task_id: task.id,
            title: task.title.clone(),
            project_manager_id,
        },
    ));
}
