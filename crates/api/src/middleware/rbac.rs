//! Role gate for endpoints that sit outside the per-resource authorization
//! engine.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use taskforge_core::authz::DenyReason;
use taskforge_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the ADMIN role. Rejects with 403 otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(admin): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.principal.is_admin() {
            return Err(AppError::Core(CoreError::Denied(DenyReason::InsufficientScope)));
        }
        Ok(RequireAdmin(user))
    }
}
