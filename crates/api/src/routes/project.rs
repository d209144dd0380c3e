//! Route definitions for the `/projects` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET, POST     /                          list, create
/// GET, PUT, DEL /{id}                      get_by_id, update, delete
/// GET, POST     /{id}/members              list_members, add_member
/// DELETE        /{id}/members/{user_id}    remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route(
            "/{id}",
            get(project::get_by_id).put(project::update).delete(project::delete),
        )
        .route("/{id}/members", get(project::list_members).post(project::add_member))
        .route("/{id}/members/{user_id}", delete(project::remove_member))
}
