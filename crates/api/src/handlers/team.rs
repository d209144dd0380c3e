//! Handlers for the `/teams` resource and its members.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{self as engine, Action, Resource, TeamScope};
use taskforge_core::error::{ConflictKind, CoreError};
use taskforge_core::roles::Role;
use taskforge_core::types::DbId;
use taskforge_db::models::team::{AddTeamMember, CreateTeam, Team, TeamWithMembers, UpdateTeam};
use taskforge_db::repositories::TeamRepo;

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/teams
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateTeam>,
) -> AppResult<(StatusCode, Json<DataResponse<TeamWithMembers>>)> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Team name must not be empty".into()).into());
    }
    if let Some(leader_id) = input.leader_id {
        access::user_department(&state.pool, leader_id).await?;
    }
    let scope = TeamScope {
        department_id: input.department_id,
        leader_id: input.leader_id,
        member_ids: Vec::new(),
    };
    authorize(&user, Action::Create, &Resource::Team(scope))?;

    let team = TeamRepo::create(&state.pool, &input).await?;
    let member_ids = TeamRepo::member_ids(&state.pool, team.id).await?;
    tracing::info!(team_id = team.id, user_id = user.id(), "Team created");

    let created = TeamWithMembers { team, member_ids };
    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::CREATE_TEAM,
        entities::TEAM,
        Some(created.team.id),
        AuditChanges::created(&created),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/teams
///
/// Filtered to the teams the caller may read.
pub async fn list(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<DataResponse<Vec<Team>>>> {
    let principal = &user.principal;
    let candidates = match (principal.role, principal.department_id) {
        (Role::Admin, _) => return Ok(Json(DataResponse { data: TeamRepo::list(&state.pool, None).await? })),
        (Role::Manager, Some(department_id)) => TeamRepo::list(&state.pool, Some(department_id)).await?,
        _ => TeamRepo::list(&state.pool, None).await?,
    };

    let mut visible = Vec::with_capacity(candidates.len());
    for team in candidates {
        let scope = TeamScope {
            department_id: team.department_id,
            leader_id: team.leader_id,
            member_ids: TeamRepo::member_ids(&state.pool, team.id).await?,
        };
        if engine::authorize(principal, Action::Read, &Resource::Team(scope)).is_allowed() {
            visible.push(team);
        }
    }
    Ok(Json(DataResponse { data: visible }))
}

/// GET /api/v1/teams/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TeamWithMembers>>> {
    let (team, scope) = access::load_team(&state.pool, id).await?;
    let member_ids = scope.member_ids.clone();
    authorize(&user, Action::Read, &Resource::Team(scope))?;
    Ok(Json(DataResponse {
        data: TeamWithMembers { team, member_ids },
    }))
}

/// PUT /api/v1/teams/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTeam>,
) -> AppResult<Json<DataResponse<Team>>> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation("Team name must not be empty".into()).into());
    }
    let (old, scope) = access::load_team(&state.pool, id).await?;
    authorize(&user, Action::Update, &Resource::Team(scope))?;

    let team = TeamRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Team", id))?;
    tracing::info!(team_id = id, user_id = user.id(), "Team updated");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_TEAM,
        entities::TEAM,
        Some(id),
        AuditChanges::updated(&old, &team),
    )
    .await?;
    Ok(Json(DataResponse { data: team }))
}

/// DELETE /api/v1/teams/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (team, scope) = access::load_team(&state.pool, id).await?;
    authorize(&user, Action::Delete, &Resource::Team(scope))?;

    if !TeamRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Team", id));
    }
    tracing::info!(team_id = id, user_id = user.id(), "Team deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_TEAM,
        entities::TEAM,
        Some(id),
        AuditChanges::deleted(&team),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/teams/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<AddTeamMember>,
) -> AppResult<StatusCode> {
    let (_, team) = access::load_team(&state.pool, id).await?;
    let member_department_id = access::user_department(&state.pool, input.user_id).await?;
    authorize(
        &user,
        Action::AddMember,
        &Resource::TeamMember {
            team,
            member_department_id,
        },
    )?;

    if !TeamRepo::add_member(&state.pool, id, input.user_id).await? {
        return Err(CoreError::conflict(
            ConflictKind::DuplicateMember,
            format!("User {} is already a member of team {id}", input.user_id),
        )
        .into());
    }
    tracing::info!(team_id = id, member_id = input.user_id, "Team member added");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::ADD_TEAM_MEMBER,
        entities::TEAM,
        Some(id),
        AuditChanges::custom("addedMember", &serde_json::json!({ "userId": input.user_id })),
    )
    .await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /api/v1/teams/{id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path((id, member_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let (_, team) = access::load_team(&state.pool, id).await?;
    let member_department_id = access::user_department(&state.pool, member_id).await?;
    authorize(
        &user,
        Action::RemoveMember,
        &Resource::TeamMember {
            team,
            member_department_id,
        },
    )?;

    if !TeamRepo::remove_member(&state.pool, id, member_id).await? {
        return Err(AppError::not_found("TeamMember", member_id));
    }
    tracing::info!(team_id = id, member_id, "Team member removed");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::REMOVE_TEAM_MEMBER,
        entities::TEAM,
        Some(id),
        AuditChanges::custom("removedMember", &serde_json::json!({ "userId": member_id })),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
