//! Route definitions for the `/documents` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::document;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET, POST     /          list, upload (multipart)
/// GET, PUT, DEL /{id}      get_by_id, update (multipart), delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(document::list).post(document::upload))
        .route(
            "/{id}",
            get(document::get_by_id).put(document::update).delete(document::delete),
        )
}
