//! Handlers for the `/documents` resource.
//!
//! Documents belong to a project and optionally to one of its tasks. An
//! update writes a new version and retires the old row; delete retires the
//! head without touching stored bytes, since earlier versions may share them.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::authz::{Action, DenyReason, Resource};
use taskforge_core::document::{parse_tags, DocumentCategory};
use taskforge_core::error::CoreError;
use taskforge_core::roles::{permissions as perm, Role};
use taskforge_core::types::DbId;
use taskforge_db::models::document::{
    CreateDocument, Document, DocumentFile, DocumentListFilter, NewDocumentVersion,
};
use taskforge_db::models::project::ProjectVisibility;
use taskforge_db::repositories::DocumentRepo;

use crate::access::{self, authorize};
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::query::PageParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;
use crate::storage::FileStore;
use crate::upload::{UploadForm, UploadedFile};

#[derive(Debug, Deserialize)]
pub struct DocumentListParams {
    pub project_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub category: Option<DocumentCategory>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn category_field(form: &UploadForm) -> AppResult<Option<DocumentCategory>> {
    Ok(form.text("category").map(DocumentCategory::parse).transpose()?)
}

/// Write the bytes under the project's document namespace.
async fn store_file(state: &AppState, project_id: DbId, upload: UploadedFile) -> AppResult<DocumentFile> {
    let path = state
        .file_store
        .put(&format!("documents/{project_id}"), &upload.filename, &upload.data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store document: {e}")))?;
    Ok(DocumentFile {
        size_bytes: upload.size_bytes(),
        filename: upload.filename,
        path,
        mimetype: upload.mimetype,
    })
}

async fn discard_file(state: &AppState, path: &str) {
    if let Err(e) = state.file_store.delete(path).await {
        tracing::warn!(path, error = %e, "Failed to remove orphaned document file");
    }
}

/// POST /api/v1/documents
///
/// Multipart form: `file` and `project_id` are required; `task_id`,
/// `category` and a comma-separated `tags` list are optional.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let mut form = UploadForm::read(multipart).await?;
    let project_id = form
        .id("project_id")?
        .ok_or_else(|| AppError::BadRequest("Missing required 'project_id' field".into()))?;
    let task_id = form.id("task_id")?;

    let (_, scope) = access::load_project(&state.pool, project_id).await?;
    authorize(&user, Action::Create, &Resource::Document(scope))?;

    if let Some(task_id) = task_id {
        let (task, _) = access::load_task(&state.pool, task_id).await?;
        if task.project_id != project_id {
            return Err(CoreError::Validation(format!(
                "Task {task_id} does not belong to project {project_id}"
            ))
            .into());
        }
    }
    let category = category_field(&form)?.unwrap_or_default();
    let tags = form.text("tags").map(parse_tags).unwrap_or_default();
    let upload = form.require_file()?;
    upload.validate(state.config.max_attachment_bytes)?;

    let file = store_file(&state, project_id, upload).await?;
    let input = CreateDocument {
        project_id,
        task_id,
        filename: file.filename,
        path: file.path,
        size_bytes: file.size_bytes,
        mimetype: file.mimetype,
        uploaded_by: user.id(),
        category,
        tags,
    };
    let document = match DocumentRepo::create(&state.pool, &input).await {
        Ok(document) => document,
        Err(e) => {
            discard_file(&state, &input.path).await;
            return Err(e.into());
        }
    };
    tracing::info!(project_id, document_id = document.id, size_bytes = document.size_bytes, "Document uploaded");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPLOAD_DOCUMENT,
        entities::DOCUMENT,
        Some(document.id),
        AuditChanges::created(&document),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// GET /api/v1/documents
///
/// Active versions only, newest first. A document is listed wherever its
/// project would be.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<DocumentListParams>,
) -> AppResult<Json<DataResponse<Page<Document>>>> {
    let principal = &user.principal;
    if !principal.has_permission(perm::DOCUMENT_READ) {
        return Err(CoreError::Denied(DenyReason::MissingPermission(perm::DOCUMENT_READ)).into());
    }
    let visibility = match (principal.role, principal.department_id) {
        (Role::Admin, _) => ProjectVisibility::All,
        (Role::Manager, Some(department_id)) => ProjectVisibility::DepartmentOrInvolving {
            department_id,
            user_id: principal.id,
        },
        _ => ProjectVisibility::Involving(principal.id),
    };

    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let filter = DocumentListFilter {
        visibility,
        project_id: params.project_id,
        task_id: params.task_id,
        category: params.category,
        limit,
        offset,
    };
    let items = DocumentRepo::list(&state.pool, &filter).await?;
    let total = DocumentRepo::count(&state.pool, &filter).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page,
            limit,
        },
    }))
}

/// GET /api/v1/documents/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    let (document, scope) = access::load_document(&state.pool, id).await?;
    authorize(&user, Action::Read, &Resource::Document(scope))?;
    Ok(Json(DataResponse { data: document }))
}

/// PUT /api/v1/documents/{id}
///
/// Multipart form with optional `file`, `category` and `tags`. Answers
/// with the new version; `{id}` stops resolving once it is superseded.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<Document>>> {
    let (current, scope) = access::load_document(&state.pool, id).await?;
    authorize(&user, Action::Update, &Resource::Document(scope))?;

    let mut form = UploadForm::read(multipart).await?;
    let category = category_field(&form)?;
    let tags = form.text("tags").map(parse_tags);
    let file = match form.file.take() {
        Some(upload) => {
            upload.validate(state.config.max_attachment_bytes)?;
            Some(store_file(&state, current.project_id, upload).await?)
        }
        None => None,
    };
    let stored_path = file.as_ref().map(|f| f.path.clone());

    let input = NewDocumentVersion {
        uploaded_by: user.id(),
        file,
        category,
        tags,
    };
    let next = match DocumentRepo::new_version(&state.pool, id, &input).await {
        Ok(Some(next)) => next,
        result => {
            if let Some(path) = &stored_path {
                discard_file(&state, path).await;
            }
            result?;
            return Err(AppError::not_found("Document", id));
        }
    };
    tracing::info!(
        previous_id = id,
        document_id = next.id,
        version = next.version,
        "Document version created"
    );

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::UPDATE_DOCUMENT,
        entities::DOCUMENT,
        Some(next.id),
        AuditChanges::updated(&current, &next),
    )
    .await?;

    Ok(Json(DataResponse { data: next }))
}

/// DELETE /api/v1/documents/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (document, scope) = access::load_document(&state.pool, id).await?;
    authorize(&user, Action::Delete, &Resource::Document(scope))?;

    if !DocumentRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Document", id));
    }
    tracing::info!(document_id = id, user_id = user.id(), "Document deleted");

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&user, &client),
        actions::DELETE_DOCUMENT,
        entities::DOCUMENT,
        Some(id),
        AuditChanges::deleted(&document),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
