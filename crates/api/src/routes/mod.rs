pub mod admin;
pub mod department;
pub mod document;
pub mod health;
pub mod notification;
pub mod project;
pub mod task;
pub mod team;
pub mod time_log;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Every route requires a bearer token.
///
/// ```text
/// /authz/check                                  authorization check (POST)
///
/// /departments                                  list, create
/// /departments/{id}                             get, update, delete
///
/// /projects                                     list, create
/// /projects/{id}                                get, update, delete
/// /projects/{id}/members                        list, add
/// /projects/{id}/members/{user_id}              remove
///
/// /teams                                        list, create
/// /teams/{id}                                   get, update, delete
/// /teams/{id}/members                           add
/// /teams/{id}/members/{user_id}                 remove
///
/// /tasks                                        list, create
/// /tasks/{id}                                   get, update, delete
/// /tasks/{id}/status                            update status (PATCH)
/// /tasks/{id}/subtasks                          list, link
/// /tasks/{id}/subtasks/{subtask_id}             unlink
/// /tasks/{id}/dependencies                      add
/// /tasks/{id}/dependencies/{dependency_id}      remove
/// /tasks/{id}/attachments                       list, upload (multipart)
/// /tasks/{id}/attachments/{attachment_id}       delete
/// /tasks/{id}/comments                          list, create
///
/// /documents                                    list, upload (multipart)
/// /documents/{id}                               get, new version (multipart PUT), delete
///
/// /time                                         caller's logs
/// /time/start                                   start timer (POST)
/// /time/running                                 caller's running timer
/// /time/{id}                                    get
/// /time/{id}/stop                               stop timer (POST)
///
/// /notifications                                caller's notifications
/// /notifications/unread-count                   unread count
/// /notifications/read-all                       mark all read (POST)
/// /notifications/{id}/read                      mark read (POST)
///
/// /admin/audit-logs                             query, purge (DELETE ?days)
/// /admin/audit-logs/integrity-check             verify hash chain
/// /admin/notifications                          send (POST, admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/authz/check", post(handlers::authz::check))
        .nest("/departments", department::router())
        .nest("/projects", project::router())
        .nest("/teams", team::router())
        .nest("/tasks", task::router())
        .nest("/documents", document::router())
        .nest("/time", time_log::router())
        .nest("/notifications", notification::router())
        .nest("/admin/audit-logs", admin::audit_router())
        .nest("/admin/notifications", admin::notification_router())
}
