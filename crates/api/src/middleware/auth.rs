//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use taskforge_core::error::CoreError;
use taskforge_core::principal::Principal;
use taskforge_core::types::DbId;
use taskforge_db::repositories::UserRepo;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller.
///
/// The token only proves who the caller is. Role, department and
/// permissions are read from the store on every request, so a deactivated
/// user or a changed role takes effect immediately.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.id(), role = %user.principal.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

impl AuthUser {
    pub fn id(&self) -> DbId {
        self.principal.id
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| unauthorized("Invalid or expired token"))?;

        let identity = UserRepo::find_identity(&state.pool, claims.sub)
            .await?
            .filter(|identity| identity.is_active)
            .ok_or_else(|| {
                tracing::debug!(user_id = claims.sub, "Token subject missing or inactive");
                unauthorized("User is inactive or does not exist")
            })?;

        Ok(AuthUser {
            principal: identity.into_principal()?,
        })
    }
}
