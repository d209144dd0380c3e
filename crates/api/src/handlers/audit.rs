//! Handlers for `/admin/audit-logs`: query, retention purge and chain
//! verification.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use taskforge_core::audit::{validate_retention_days, DEFAULT_AUDIT_PAGE_SIZE, DEFAULT_RETENTION_DAYS, MAX_AUDIT_PAGE_SIZE};
use taskforge_core::authz::{Action, Resource};
use taskforge_core::pagination::{clamp_limit, clamp_page};
use taskforge_db::models::audit::{AuditLog, AuditQuery, IntegrityReport};
use taskforge_db::repositories::AuditLogRepo;

use crate::access::authorize;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResult {
    pub days: i64,
    pub deleted_count: u64,
    pub cleanup_entry: AuditLog,
}

/// GET /api/v1/admin/audit-logs
pub async fn query(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Page<AuditLog>>>> {
    authorize(&user, Action::ViewAudit, &Resource::AuditLog)?;

    let items = AuditLogRepo::query(&state.pool, &params).await?;
    let total = AuditLogRepo::count(&state.pool, &params).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            page: clamp_page(params.page),
            limit: clamp_limit(params.limit, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE),
        },
    }))
}

/// DELETE /api/v1/admin/audit-logs?days=N
///
/// Removes entries older than `days` and records the purge as a
/// `CLEANUP_AUDIT_LOGS` entry.
pub async fn purge(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PurgeParams>,
) -> AppResult<Json<DataResponse<PurgeResult>>> {
    authorize(&user, Action::PurgeAudit, &Resource::AuditLog)?;

    let days = params.days.unwrap_or(DEFAULT_RETENTION_DAYS);
    validate_retention_days(days)?;

    let now = Utc::now();
    let cutoff = now - Duration::days(days);
    let (deleted_count, cleanup_entry) =
        AuditLogRepo::purge_older_than(&state.pool, cutoff, days, Some(user.id()), now).await?;
    tracing::info!(days, deleted_count, user_id = user.id(), "Audit logs purged");

    Ok(Json(DataResponse {
        data: PurgeResult {
            days,
            deleted_count,
            cleanup_entry,
        },
    }))
}

/// GET /api/v1/admin/audit-logs/integrity-check
pub async fn integrity_check(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<IntegrityReport>>> {
    authorize(&user, Action::ViewAudit, &Resource::AuditLog)?;

    let report = AuditLogRepo::verify_chain(&state.pool).await?;
    if !report.valid {
        tracing::warn!(first_broken_id = ?report.first_broken_id, "Audit chain verification failed");
    }
    Ok(Json(DataResponse { data: report }))
}
