//! Route definitions for the `/time` resource (timers and time logs).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::time_log;
use crate::state::AppState;

/// Routes mounted at `/time`.
///
/// ```text
/// GET    /             list (caller's logs)
/// POST   /start        start
/// GET    /running      running
/// GET    /{id}         get_by_id
/// POST   /{id}/stop    stop
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(time_log::list))
        .route("/start", post(time_log::start))
        .route("/running", get(time_log::running))
        .route("/{id}", get(time_log::get_by_id))
        .route("/{id}/stop", post(time_log::stop))
}
