//! Handlers for the `/departments` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, Resource};
use taskforge_core::error::CoreError;
use taskforge_core::types::DbId;
use taskforge_db::models::department::{CreateDepartment, Department, DepartmentWithMembers, UpdateDepartment};
use taskforge_db::repositories::DepartmentRepo;

use crate::access::authorize;
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::response::DataResponse;
use crate::state::AppState;

async fn find(state: &AppState, id: DbId) -> AppResult<Department> {
    DepartmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Department", id))
}

/// POST /api/v1/departments
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateDepartment>,
) -> AppResult<(StatusCode, Json<DataResponse<Department>>)> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Department name must not be empty".into()).into());
    }
    authorize(&user, Action::Create, &Resource::Department { id: None })?;

    let department = DepartmentRepo::create(&state.pool, &input).await?;
    tracing::info!(department_id = department.id, user_id = user.id(), "Department created");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::CREATE_DEPARTMENT,
        entities::DEPARTMENT,
        Some(department.id),
        AuditChanges::created(&department),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: department })))
}

/// GET /api/v1/departments
///
/// ADMIN lists every department; anyone else only their own.
pub async fn list(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<DataResponse<Vec<Department>>>> {
    let principal = &user.principal;
    let departments = if principal.is_admin() {
        DepartmentRepo::list(&state.pool, None).await?
    } else if let Some(own) = principal.department_id {
        DepartmentRepo::list(&state.pool, Some(own)).await?
    } else {
        Vec::new()
    };
    Ok(Json(DataResponse { data: departments }))
}

/// GET /api/v1/departments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DepartmentWithMembers>>> {
    let department = find(&state, id).await?;
    authorize(&user, Action::Read, &Resource::Department { id: Some(id) })?;
    let member_ids = DepartmentRepo::member_ids(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: DepartmentWithMembers { department, member_ids },
    }))
}

/// PUT /api/v1/departments/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDepartment>,
) -> AppResult<Json<DataResponse<Department>>> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation("Department name must not be empty".into()).into());
    }
    let old = find(&state, id).await?;
    authorize(&user, Action::Update, &Resource::Department { id: Some(id) })?;

    let department = DepartmentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Department", id))?;
    tracing::info!(department_id = id, user_id = user.id(), "Department updated");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_DEPARTMENT,
        entities::DEPARTMENT,
        Some(id),
        AuditChanges::updated(&old, &department),
    )
    .await?;
    Ok(Json(DataResponse { data: department }))
}

/// DELETE /api/v1/departments/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let department = find(&state, id).await?;
    authorize(&user, Action::Delete, &Resource::Department { id: Some(id) })?;

    if !DepartmentRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Department", id));
    }
    tracing::info!(department_id = id, user_id = user.id(), "Department deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_DEPARTMENT,
        entities::DEPARTMENT,
        Some(id),
        AuditChanges::deleted(&department),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
