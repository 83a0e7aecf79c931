//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::gateway::{LoginRequest, User};
use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/v1/auth/login
///
/// Forward the credentials to the auth service and return its token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<TokenResponse>>> {
    let token = state.auth.login(&input).await.inspect_err(|e| {
        tracing::info!(username = %input.username, error = %e, "Login rejected");
    })?;
    tracing::info!(username = %input.username, "User logged in");
    Ok(Json(DataResponse {
        data: TokenResponse { token },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(RequireAuth(auth): RequireAuth) -> AppResult<Json<DataResponse<User>>> {
    Ok(Json(DataResponse { data: auth.user }))
}
