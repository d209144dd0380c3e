//! Route definitions for the `/tasks` resource and its sub-resources.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::{attachment, comment, task};
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET, POST     /                                     list, create
/// GET, PUT, DEL /{id}                                 get_by_id, update, delete
/// PATCH         /{id}/status                          update_status
/// GET, POST     /{id}/subtasks                        list_subtasks, add_subtask
/// DELETE        /{id}/subtasks/{subtask_id}           remove_subtask
/// POST          /{id}/dependencies                    add_dependency
/// DELETE        /{id}/dependencies/{dependency_id}    remove_dependency
/// GET, POST     /{id}/attachments                     list, upload
/// DELETE        /{id}/attachments/{attachment_id}     delete
/// GET, POST     /{id}/comments                        list, create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list).post(task::create))
        .route("/{id}", get(task::get_by_id).put(task::update).delete(task::delete))
        .route("/{id}/status", patch(task::update_status))
        // Hierarchy and dependencies
        .route("/{id}/subtasks", get(task::list_subtasks).post(task::add_subtask))
        .route("/{id}/subtasks/{subtask_id}", delete(task::remove_subtask))
        .route("/{id}/dependencies", post(task::add_dependency))
        .route("/{id}/dependencies/{dependency_id}", delete(task::remove_dependency))
        // Attachments
        .route("/{id}/attachments", get(attachment::list).post(attachment::upload))
        .route("/{id}/attachments/{attachment_id}", delete(attachment::delete))
        // Comments
        .route("/{id}/comments", get(comment::list).post(comment::create))
}
