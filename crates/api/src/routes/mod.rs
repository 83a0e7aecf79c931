pub mod auth;
pub mod health;
pub mod submission;
pub mod template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                              login (public)
/// /auth/me                                 current user
///
/// /templates                               list (any user), create (admin)
/// /templates/{id}                          get (any user), sync (admin)
///
/// /submissions                             list (admin: all, seller: own), create
/// /submissions/{id}                        get (owner or admin)
/// /submissions/{id}/fields                 sync answers (owner or admin)
/// /submissions/{id}/submit                 send for review (owner)
/// /submissions/{id}/approve                approve (admin)
/// /submissions/{id}/request-changes        request changes (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/templates", template::router())
        .nest("/submissions", submission::router())
}
