//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fichas_core::error::CoreError;

use crate::auth::gateway::User;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user resolved from the Bearer token in the `Authorization`
/// header.
///
/// The token is kept so handlers can make further auth service calls on
/// the user's behalf (e.g. looking up other users).
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %auth.user.id, role = %auth.user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: String,
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let user = state.auth.current_user(token).await?;

        if !user.account_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is inactive".into(),
            )));
        }

        Ok(AuthUser {
            token: token.to_string(),
            user,
        })
    }
}
