//! User rows and the identity projection used to build a `Principal`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::error::CoreError;
use taskforge_core::principal::Principal;
use taskforge_core::roles::Role;
use taskforge_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub full_name: String,
    pub role_id: i16,
    pub department_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// `users` joined with `roles`: everything needed to authorize a request.
#[derive(Debug, Clone, FromRow)]
pub struct UserIdentity {
    pub id: DbId,
    pub role_name: String,
    pub department_id: Option<DbId>,
    pub permissions: Vec<String>,
    pub is_active: bool,
}

impl UserIdentity {
    pub fn into_principal(self) -> Result<Principal, CoreError> {
        let role = Role::from_name(&self.role_name)?;
        Ok(Principal::new(
            self.id,
            role,
            self.department_id,
            self.permissions,
        ))
    }
}

/// DTO for inserting a user. Account management is handled elsewhere;
/// this exists for seeding and tests.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<DbId>,
}
