//! Handlers for `/tasks/{id}/attachments`.
//!
//! Bytes go through the [`FileStore`](crate::storage::FileStore); rows in
//! `task_attachments` only record the storage key.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, Resource};
use taskforge_core::types::DbId;
use taskforge_db::models::task::{CreateAttachment, TaskAttachment};
use taskforge_db::repositories::AttachmentRepo;

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::FileStore;
use crate::upload::UploadForm;

/// POST /api/v1/tasks/{id}/attachments
///
/// Accepts a multipart form with a required `file` field.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(task_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<TaskAttachment>>)> {
    let (_, scope) = access::load_task(&state.pool, task_id).await?;
    authorize(&user, Action::UploadAttachment, &Resource::Task(scope))?;

    let upload = UploadForm::read(multipart).await?.require_file()?;
    upload.validate(state.config.max_attachment_bytes)?;

    let key = state
        .file_store
        .put(&task_id.to_string(), &upload.filename, &upload.data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store attachment: {e}")))?;

    let size_bytes = upload.size_bytes();
    let input = CreateAttachment {
        task_id,
        filename: upload.filename,
        path: key,
        size_bytes,
        mimetype: upload.mimetype,
        uploaded_by: user.id(),
    };
    let attachment = match AttachmentRepo::create(&state.pool, &input).await {
        Ok(attachment) => attachment,
        Err(e) => {
            // The row never landed; do not leave the bytes behind.
            if let Err(cleanup) = state.file_store.delete(&input.path).await {
                tracing::warn!(path = %input.path, error = %cleanup, "Failed to remove orphaned attachment file");
            }
            return Err(e.into());
        }
    };
    tracing::info!(task_id, attachment_id = attachment.id, size_bytes = attachment.size_bytes, "Attachment uploaded");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPLOAD_ATTACHMENT,
        entities::TASK,
        Some(task_id),
        AuditChanges::custom("attachment", &attachment),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: attachment })))
}

/// GET /api/v1/tasks/{id}/attachments
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<TaskAttachment>>>> {
    let (_, scope) = access::load_task(&state.pool, task_id).await?;
    authorize(&user, Action::Read, &Resource::Task(scope))?;
    let attachments = AttachmentRepo::list_for_task(&state.pool, task_id).await?;
    Ok(Json(DataResponse { data: attachments }))
}

/// DELETE /api/v1/tasks/{id}/attachments/{attachment_id}
///
/// The file goes first. If that fails the row is left alone, so a row is
/// never removed while its bytes remain.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path((task_id, attachment_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let (_, task) = access::load_task(&state.pool, task_id).await?;
    let attachment = AttachmentRepo::find_for_task(&state.pool, task_id, attachment_id)
        .await?
        .ok_or(AppError::not_found("Attachment", attachment_id))?;
    authorize(
        &user,
        Action::DeleteAttachment,
        &Resource::Attachment {
            task,
            uploaded_by: attachment.uploaded_by,
        },
    )?;

    state.file_store.delete(&attachment.path).await.map_err(|e| {
        AppError::InternalError(format!("Failed to delete attachment file {}: {e}", attachment.path))
    })?;
    if !AttachmentRepo::delete(&state.pool, attachment_id).await? {
        return Err(AppError::not_found("Attachment", attachment_id));
    }
    tracing::info!(task_id, attachment_id, "Attachment deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_ATTACHMENT,
        entities::TASK,
        Some(task_id),
        AuditChanges::custom("deletedAttachment", &attachment),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
