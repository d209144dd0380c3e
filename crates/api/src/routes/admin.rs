//! Route definitions under `/admin`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{audit, notification};
use crate::state::AppState;

/// Audit routes mounted at `/admin/audit-logs`.
///
/// Access is decided by the authorization engine (`audit:view`,
/// `audit:purge`).
///
/// ```text
/// GET     /                    query
/// DELETE  /?days=N             purge
/// GET     /integrity-check     integrity_check
/// ```
pub fn audit_router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::query).delete(audit::purge))
        .route("/integrity-check", get(audit::integrity_check))
}

/// Routes mounted at `/admin/notifications` (ADMIN only).
///
/// ```text
/// POST   /    send
/// ```
pub fn notification_router() -> Router<AppState> {
    Router::new().route("/", post(notification::send))
}
