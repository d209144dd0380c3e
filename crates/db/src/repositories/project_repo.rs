//! Repository for the `projects` and `project_members` tables.

use sqlx::PgPool;
use taskforge_core::task_graph::TaskPriority;
use taskforge_core::types::DbId;

use crate::models::project::{
    CreateProject, MemberRole, Project, ProjectMember, ProjectVisibility, UpdateProject,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, name, code, description, manager_id, department_id, status_id, priority, \
    start_date, end_date, estimated_hours, actual_hours, is_active, created_at, updated_at";

const MEMBER_COLUMNS: &str = "project_id, user_id, role, added_at";

/// Provides CRUD and membership operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a project and its manager as a LEAD member in one transaction.
    ///
    /// A missing `code` is generated as `PROJ-NNNN`; any code is stored
    /// uppercase.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects \
                (name, code, description, manager_id, department_id, priority, \
                 start_date, end_date, estimated_hours) \
             VALUES ($1, \
                     COALESCE(UPPER($2), 'PROJ-' || LPAD(nextval('project_code_seq')::TEXT, 4, '0')), \
                     $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(input.name.trim())
            .bind(input.code.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.manager_id)
            .bind(input.department_id)
            .bind(input.priority.unwrap_or_default().as_str())
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.estimated_hours)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(project.id)
            .bind(project.manager_id)
            .bind(MemberRole::Lead.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Find an active project by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active projects visible under `visibility`, newest first.
    pub async fn list(
        pool: &PgPool,
        visibility: ProjectVisibility,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let (dept, user) = visibility_binds(visibility);
        let query = format!(
            "SELECT {COLUMNS} FROM projects p \
             WHERE p.is_active {VISIBILITY_CLAUSE} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(dept)
            .bind(user)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, visibility: ProjectVisibility) -> Result<i64, sqlx::Error> {
        let (dept, user) = visibility_binds(visibility);
        let query =
            format!("SELECT COUNT(*)::BIGINT FROM projects p WHERE p.is_active {VISIBILITY_CLAUSE}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(dept)
            .bind(user)
            .fetch_one(pool)
            .await
    }

    /// Apply non-`None` fields. Returns `None` if no active row matched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                status_id = COALESCE($4, status_id), \
                priority = COALESCE($5, priority), \
                start_date = COALESCE($6, start_date), \
                end_date = COALESCE($7, end_date), \
                estimated_hours = COALESCE($8, estimated_hours) \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.status.map(|s| s.id()))
            .bind(input.priority.map(TaskPriority::as_str))
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.estimated_hours)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete. Returns `true` if a row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    pub async fn members(pool: &PgPool, project_id: DbId) -> Result<Vec<ProjectMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = $1 ORDER BY added_at, user_id"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn member_ids(pool: &PgPool, project_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT user_id FROM project_members WHERE project_id = $1 ORDER BY user_id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Add a member. Returns `None` when the user is already a member; the
    /// primary key makes the check atomic.
    pub async fn add_member(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
    ) -> Result<Option<ProjectMember>, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_members (project_id, user_id, role) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (project_id, user_id) DO NOTHING \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Remove a member. The project manager cannot be removed. Returns the
    /// removed row, or `None` if nothing matched.
    pub async fn remove_member(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ProjectMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            "DELETE FROM project_members pm \
             USING projects p \
             WHERE pm.project_id = $1 AND pm.user_id = $2 \
               AND p.id = pm.project_id AND p.manager_id <> pm.user_id \
             RETURNING pm.project_id, pm.user_id, pm.role, pm.added_at",
        )
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}

/// Restricts `projects p` by `$1` (department id) and `$2` (user id). A
/// null user id means no restriction.
const VISIBILITY_CLAUSE: &str = "\
    AND ($2::BIGINT IS NULL \
         OR p.department_id = $1::BIGINT \
         OR p.manager_id = $2 \
         OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $2))";

pub(crate) fn visibility_binds(visibility: ProjectVisibility) -> (Option<DbId>, Option<DbId>) {
    match visibility {
        ProjectVisibility::All => (None, None),
        ProjectVisibility::Involving(user_id) => (None, Some(user_id)),
        ProjectVisibility::DepartmentOrInvolving {
            department_id,
            user_id,
        } => (Some(department_id), Some(user_id)),
    }
}
