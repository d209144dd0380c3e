//! Repository for the `users` table.

use sqlx::PgPool;
use taskforge_core::types::DbId;

use crate::models::user::{CreateUser, User, UserIdentity};

const COLUMNS: &str =
    "id, email, full_name, role_id, department_id, is_active, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    /// Insert a user with the role named in `input`.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, full_name, role_id, department_id) \
             VALUES ($1, $2, (SELECT id FROM roles WHERE name = $3), $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(input.role.as_str())
            .bind(input.department_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND is_active");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load role, department and permissions for the identity context.
    ///
    /// Inactive users are returned too; the caller decides how to reject them.
    pub async fn find_identity(pool: &PgPool, id: DbId) -> Result<Option<UserIdentity>, sqlx::Error> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT u.id, r.name AS role_name, u.department_id, r.permissions, u.is_active \
             FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Department of an active user. `None` when the user does not exist;
    /// `Some(None)` when they exist without a department.
    pub async fn department_of(pool: &PgPool, id: DbId) -> Result<Option<Option<DbId>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT department_id FROM users WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(pool: &PgPool, id: DbId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
