//! Route definitions for the `/submissions` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::submission;
use crate::state::AppState;

/// Routes mounted at `/submissions`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// GET    /{id}                    -> get_by_id
/// PUT    /{id}/fields             -> sync_fields
/// POST   /{id}/submit             -> submit
/// POST   /{id}/approve            -> approve (admin)
/// POST   /{id}/request-changes    -> request_changes (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(submission::list).post(submission::create))
        .route("/{id}", get(submission::get_by_id))
        .route("/{id}/fields", put(submission::sync_fields))
        .route("/{id}/submit", post(submission::submit))
        .route("/{id}/approve", post(submission::approve))
        .route("/{id}/request-changes", post(submission::request_changes))
}
