//! Route definitions for the `/templates` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::template;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create (admin)
/// GET    /{id}    -> get_by_id
/// PUT    /{id}    -> sync (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(template::list).post(template::create))
        .route("/{id}", get(template::get_by_id).put(template::sync))
}
