//! Handlers for `/tasks/{id}/comments`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, Resource};
use taskforge_core::error::CoreError;
use taskforge_core::types::DbId;
use taskforge_db::models::comment::{Comment, CreateComment};
use taskforge_db::repositories::CommentRepo;
use taskforge_events::notifications::{self, CommentCreated};

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_COMMENT_LEN: usize = 2000;

/// POST /api/v1/tasks/{id}/comments
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(task_id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<DataResponse<Comment>>)> {
    let content = input.content.trim();
    if content.is_empty() || content.chars().count() > MAX_COMMENT_LEN {
        return Err(CoreError::Validation(format!(
            "Comment must be between 1 and {MAX_COMMENT_LEN} characters"
        ))
        .into());
    }

    let (task, scope) = access::load_task(&state.pool, task_id).await?;
    authorize(&user, Action::Comment, &Resource::Task(scope))?;

    if let Some(parent_id) = input.parent_comment_id {
        let parent = CommentRepo::find_by_id(&state.pool, parent_id).await?;
        if parent.map(|c| c.task_id) != Some(task_id) {
            return Err(CoreError::Validation(format!(
                "Comment {parent_id} does not belong to task {task_id}"
            ))
            .into());
        }
    }

    let comment = CommentRepo::create(&state.pool, task_id, user.id(), &input).await?;

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::CREATE_COMMENT,
        entities::COMMENT,
        Some(comment.id),
        AuditChanges::created(&comment),
    )
    .await?;

    state.publish(notifications::comment_created(
        user.id(),
        &CommentCreated {
            task_id,
            comment_id: comment.id,
            title: task.title.clone(),
            assignee_id: task.assigned_to,
            creator_id: task.created_by,
        },
    ));

    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}

/// GET /api/v1/tasks/{id}/comments
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Comment>>>> {
    let (_, scope) = access::load_task(&state.pool, task_id).await?;
    authorize(&user, Action::Read, &Resource::Task(scope))?;
    let comments = CommentRepo::list_for_task(&state.pool, task_id).await?;
    Ok(Json(DataResponse { data: comments }))
}
