//! Repository for the `departments` table.

use sqlx::PgPool;
use taskforge_core::types::DbId;

use crate::models::department::{CreateDepartment, Department, UpdateDepartment};

const COLUMNS: &str = "id, name, description, manager_id, is_active, created_at, updated_at";

/// Provides CRUD operations for departments. Soft-deleted rows
/// (`is_active = false`) are hidden from every read.
pub struct DepartmentRepo;

impl DepartmentRepo {
    pub async fn create(pool: &PgPool, input: &CreateDepartment) -> Result<Department, sqlx::Error> {
        let query = format!(
            "INSERT INTO departments (name, description, manager_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.manager_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Department>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM departments WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active departments, optionally only one of them.
    pub async fn list(pool: &PgPool, only: Option<DbId>) -> Result<Vec<Department>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM departments \
             WHERE is_active AND ($1::BIGINT IS NULL OR id = $1) \
             ORDER BY name"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(only)
            .fetch_all(pool)
            .await
    }

    /// Apply non-`None` fields. Returns `None` if no active row matched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDepartment,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!(
            "UPDATE departments SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                manager_id = COALESCE($4, manager_id) \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.manager_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete. Returns `true` if a row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE departments SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of active users assigned to the department.
    pub async fn member_ids(pool: &PgPool, id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM users WHERE department_id = $1 AND is_active ORDER BY id",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }
}
