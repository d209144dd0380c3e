//! Handlers for the caller's notifications and the admin send endpoint.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use taskforge_core::audit::{actions, entities, AuditChanges};
use taskforge_core::error::CoreError;
use taskforge_core::notification::{self as rules, validate_related_entity};
use taskforge_core::types::DbId;
use taskforge_db::models::notification::Notification;
use taskforge_db::repositories::NotificationRepo;
use taskforge_events::notifications::{self, NotificationRequested};

use crate::access;
use crate::audit::{AuditActor, AuditRecorder};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PageParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAccepted {
    pub recipient_count: usize,
}

/// GET /api/v1/notifications
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<DataResponse<Page<Notification>>>> {
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();

    let items = NotificationRepo::list_for_user(&state.pool, user.id(), params.unread_only, limit, offset).await?;
    let total = if params.unread_only {
        NotificationRepo::count_unread(&state.pool, user.id()).await?
    } else {
        NotificationRepo::count_for_user(&state.pool, user.id()).await?
    };
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page,
            limit,
        },
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let unread_count = NotificationRepo::count_unread(&state.pool, user.id()).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { unread_count },
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Another user's notification is reported as not found.
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = NotificationRepo::mark_read(&state.pool, id, user.id())
        .await?
        .ok_or(AppError::not_found("Notification", id))?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, user.id()).await?;
    Ok(Json(DataResponse {
        data: MarkedRead { updated },
    }))
}

/// POST /api/v1/admin/notifications
///
/// Delivery is asynchronous: the request is validated, audited, published
/// on the event bus and answered with 202.
pub async fn send(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Json(input): Json<NotificationRequested>,
) -> AppResult<(StatusCode, Json<DataResponse<SendAccepted>>)> {
    if input.title.trim().is_empty() {
        return Err(CoreError::Validation("Notification title must not be empty".into()).into());
    }
    if let Some(related) = &input.related_entity {
        validate_related_entity(related)?;
    }
    let recipients = rules::dedup_excluding(input.recipient_ids.iter().copied(), None);
    if recipients.is_empty() {
        return Err(CoreError::Validation("At least one recipient is required".into()).into());
    }
    for &recipient_id in &recipients {
        access::user_department(&state.pool, recipient_id).await?;
    }

    AuditRecorder::record(
        &state.pool,
        &AuditActor::new(&admin, &client),
        actions::SEND_NOTIFICATION,
        entities::NOTIFICATION,
        None,
        AuditChanges::custom("notification", &input),
    )
    .await?;

    state.publish(notifications::notification_requested(admin.id(), &input));
    tracing::info!(recipients = recipients.len(), kind = input.kind.as_str(), "Notification requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SendAccepted {
                recipient_count: recipients.len(),
            },
        }),
    ))
}
