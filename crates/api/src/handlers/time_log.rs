//! Handlers for `/time`: the per-user timer.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, Resource};
use taskforge_core::types::DbId;
use taskforge_db::models::time_log::{StartTimer, TimeLog};
use taskforge_db::repositories::TimeLogRepo;

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::query::PageParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

/// POST /api/v1/time/start
///
/// Starts a timer for the caller. A second start while one is running is
/// rejected with `ALREADY_RUNNING`.
pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Json(input): Json<StartTimer>,
) -> AppResult<(StatusCode, Json<DataResponse<TimeLog>>)> {
    let (task, scope) = access::load_task(&state.pool, input.task_id).await?;
    authorize(
        &user,
        Action::StartTimer,
        &Resource::TimeLog {
            owner_id: user.id(),
            task: scope,
        },
    )?;

    let log = TimeLogRepo::start(&state.pool, user.id(), task.project_id, &input, chrono::Utc::now()).await?;
    tracing::info!(time_log_id = log.id, task_id = log.task_id, user_id = user.id(), "Timer started");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::START_TIMER,
        entities::TIME_LOG,
        Some(log.id),
        AuditChanges::created(&log),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: log })))
}

/// POST /api/v1/time/{id}/stop
///
/// Only the owner may stop a timer, whatever their role.
pub async fn stop(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TimeLog>>> {
    let before = TimeLogRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("TimeLog", id))?;

    let log = TimeLogRepo::stop(&state.pool, id, user.id(), chrono::Utc::now()).await?;
    tracing::info!(
        time_log_id = id,
        duration_minutes = log.duration_minutes,
        user_id = user.id(),
        "Timer stopped"
    );

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::STOP_TIMER,
        entities::TIME_LOG,
        Some(id),
        AuditChanges::updated(&before, &log),
    )
    .await?;

    Ok(Json(DataResponse { data: log }))
}

/// GET /api/v1/time/running
///
/// The caller's running timer, or `null`.
pub async fn running(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Option<TimeLog>>>> {
    let log = TimeLogRepo::find_running(&state.pool, user.id()).await?;
    Ok(Json(DataResponse { data: log }))
}

/// GET /api/v1/time
///
/// The caller's own logs, newest first.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<TimeLog>>>> {
    let (page, limit, offset) = params.resolve();
    let items = TimeLogRepo::list_for_user(&state.pool, user.id(), limit, offset).await?;
    let total = TimeLogRepo::count_for_user(&state.pool, user.id()).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page,
            limit,
        },
    }))
}

/// GET /api/v1/time/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TimeLog>>> {
    let log = TimeLogRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("TimeLog", id))?;
    let (_, task) = access::load_task(&state.pool, log.task_id).await?;
    authorize(
        &user,
        Action::Read,
        &Resource::TimeLog {
            owner_id: log.user_id,
            task,
        },
    )?;
    Ok(Json(DataResponse { data: log }))
}
