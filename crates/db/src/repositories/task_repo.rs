//! Repository for the `tasks` table, including the parent hierarchy and
//! the dependency list.

use std::collections::BTreeMap;

use sqlx::PgPool;
use taskforge_core::error::CoreError;
use taskforge_core::task_graph::{self, TaskPriority};
use taskforge_core::types::DbId;

use crate::error::RepoError;
use crate::models::task::{CreateTask, StatusWrite, Task, TaskListFilter, TaskVisibility, UpdateTask};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, project_id, title, description, assigned_to, created_by, status_id, priority, \
    due_date, estimated_hours, actual_hours, tags, parent_task_id, dependencies, \
    completed_at, is_active, created_at, updated_at";

/// Advisory lock key serializing parent-link changes across the table.
const HIERARCHY_LOCK_KEY: i64 = 0x7461_736b_6869_6572;

/// Advisory lock key serializing dependency edits when cycle checks are on.
const DEPENDENCY_LOCK_KEY: i64 = 0x7461_736b_6465_7073;

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(pool: &PgPool, created_by: DbId, input: &CreateTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                (project_id, title, description, assigned_to, created_by, priority, \
                 due_date, estimated_hours, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.project_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.assigned_to)
            .bind(created_by)
            .bind(input.priority.unwrap_or_default().as_str())
            .bind(input.due_date)
            .bind(input.estimated_hours)
            .bind(&input.tags)
            .fetch_one(pool)
            .await
    }

    /// Find an active task by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &TaskListFilter) -> Result<Vec<Task>, sqlx::Error> {
        let (where_clause, binds) = build_task_filter(filter);
        let next = binds.len() + 1;
        let query = format!(
            "SELECT {COLUMNS} FROM tasks t {where_clause} \
             ORDER BY t.created_at DESC, t.id DESC \
             LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let mut q = sqlx::query_as::<_, Task>(&query);
        for value in &binds {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::SmallInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
            };
        }
        q.bind(filter.limit).bind(filter.offset).fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool, filter: &TaskListFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, binds) = build_task_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT FROM tasks t {where_clause}");
        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &binds {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::SmallInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
            };
        }
        q.fetch_one(pool).await
    }

    /// Full edit guarded by the status observed when `status` was computed.
    ///
    /// Returns `None` when the task is gone or its status changed in the
    /// meantime; the caller distinguishes the two.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTask,
        status: StatusWrite,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET \
                title = COALESCE($3, title), \
                description = COALESCE($4, description), \
                assigned_to = COALESCE($5, assigned_to), \
                status_id = $6, \
                completed_at = $7, \
                priority = COALESCE($8, priority), \
                due_date = COALESCE($9, due_date), \
                estimated_hours = COALESCE($10, estimated_hours), \
                tags = COALESCE($11, tags) \
             WHERE id = $1 AND is_active AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status.expected.id())
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.assigned_to)
            .bind(status.next.id())
            .bind(status.completed_at)
            .bind(input.priority.map(TaskPriority::as_str))
            .bind(input.due_date)
            .bind(input.estimated_hours)
            .bind(&input.tags)
            .fetch_optional(pool)
            .await
    }

    /// Status-only change guarded by the previously observed status.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: StatusWrite,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status_id = $3, completed_at = $4 \
             WHERE id = $1 AND is_active AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status.expected.id())
            .bind(status.next.id())
            .bind(status.completed_at)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete. Returns `true` if a row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tasks SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    /// Make `parent_id` the parent of `task_id`, replacing any prior parent.
    ///
    /// Runs under a table-wide advisory lock so two concurrent links cannot
    /// each pass the ancestor check and together form a loop.
    pub async fn set_parent(pool: &PgPool, task_id: DbId, parent_id: DbId) -> Result<Task, RepoError> {
        task_graph::validate_parent(task_id, parent_id, &[])?;

        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(HIERARCHY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let active: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE id = ANY($1) AND is_active FOR UPDATE",
        )
        .bind(vec![task_id, parent_id])
        .fetch_all(&mut *tx)
        .await?;
        for id in [task_id, parent_id] {
            if !active.contains(&id) {
                return Err(CoreError::NotFound { entity: "Task", id }.into());
            }
        }

        let ancestors: Vec<DbId> = sqlx::query_scalar(
            "WITH RECURSIVE chain(id) AS ( \
                SELECT parent_task_id FROM tasks WHERE id = $1 \
                UNION \
                SELECT t.parent_task_id FROM tasks t JOIN chain c ON t.id = c.id \
             ) \
             SELECT id FROM chain WHERE id IS NOT NULL",
        )
        .bind(parent_id)
        .fetch_all(&mut *tx)
        .await?;
        task_graph::validate_parent(task_id, parent_id, &ancestors)?;

        let query = format!(
            "UPDATE tasks SET parent_task_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    /// Clear the parent link. Idempotent: returns the task either way, or
    /// `None` if it does not exist.
    pub async fn remove_parent(pool: &PgPool, task_id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET parent_task_id = NULL WHERE id = $1 AND is_active RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Active direct children of a task.
    pub async fn subtasks(pool: &PgPool, parent_id: DbId) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks WHERE parent_task_id = $1 AND is_active ORDER BY id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Dependencies
    // -----------------------------------------------------------------------

    /// Append `dependency_id` to the task's dependency list.
    ///
    /// The duplicate check is part of the `UPDATE` predicate, so two
    /// concurrent adds of the same id leave exactly one entry. With
    /// `reject_cycles` set, a dependency that would close a transitive
    /// cycle is rejected as well.
    pub async fn add_dependency(
        pool: &PgPool,
        task_id: DbId,
        dependency_id: DbId,
        reject_cycles: bool,
    ) -> Result<Task, RepoError> {
        task_graph::validate_dependency(task_id, dependency_id, &[])?;

        let mut tx = pool.begin().await?;

        let dependency_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM tasks WHERE id = $1")
                .bind(dependency_id)
                .fetch_optional(&mut *tx)
                .await?;
        if dependency_active != Some(true) {
            return Err(CoreError::NotFound {
                entity: "Task",
                id: dependency_id,
            }
            .into());
        }

        if reject_cycles {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(DEPENDENCY_LOCK_KEY)
                .execute(&mut *tx)
                .await?;

            let rows: Vec<(DbId, Vec<DbId>)> = sqlx::query_as(
                "WITH RECURSIVE reach(id) AS ( \
                    SELECT $1::BIGINT \
                    UNION \
                    SELECT d.id FROM tasks t \
                    JOIN reach r ON t.id = r.id \
                    CROSS JOIN LATERAL UNNEST(t.dependencies) AS d(id) \
                 ) \
                 SELECT t.id, t.dependencies FROM tasks t JOIN reach r ON t.id = r.id",
            )
            .bind(dependency_id)
            .fetch_all(&mut *tx)
            .await?;
            let edges: BTreeMap<DbId, Vec<DbId>> = rows.into_iter().collect();

            if task_graph::would_create_dependency_cycle(task_id, dependency_id, &edges) {
                return Err(task_graph::dependency_cycle(task_id, dependency_id).into());
            }
        }

        let query = format!(
            "UPDATE tasks SET dependencies = array_append(dependencies, $2) \
             WHERE id = $1 AND is_active AND NOT ($2 = ANY(dependencies)) \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(dependency_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(task) = updated else {
            let exists: Option<bool> =
                sqlx::query_scalar("SELECT TRUE FROM tasks WHERE id = $1 AND is_active")
                    .bind(task_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => task_graph::duplicate_dependency(task_id, dependency_id),
                None => CoreError::NotFound {
                    entity: "Task",
                    id: task_id,
                },
            }
            .into());
        };

        tx.commit().await?;
        Ok(task)
    }

    /// Remove every occurrence of `dependency_id`. Idempotent.
    pub async fn remove_dependency(
        pool: &PgPool,
        task_id: DbId,
        dependency_id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET dependencies = array_remove(dependencies, $2) \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(dependency_id)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

enum BindValue {
    BigInt(i64),
    SmallInt(i16),
    Text(String),
}

/// Build the WHERE clause for a task listing over `tasks t`.
fn build_task_filter(filter: &TaskListFilter) -> (String, Vec<BindValue>) {
    let mut conditions = vec!["t.is_active".to_string()];
    let mut binds: Vec<BindValue> = Vec::new();

    let mut push = |sql: &str, value: BindValue, conditions: &mut Vec<String>| {
        binds.push(value);
        conditions.push(sql.replace("{}", &format!("${}", binds.len())));
    };

    match filter.visibility {
        TaskVisibility::All => {}
        TaskVisibility::AssignedTo(user_id) => {
            push("t.assigned_to = {}", BindValue::BigInt(user_id), &mut conditions)
        }
        TaskVisibility::Department(department_id) => push(
            "t.project_id IN (SELECT id FROM projects WHERE department_id = {})",
            BindValue::BigInt(department_id),
            &mut conditions,
        ),
        TaskVisibility::Involving(user_id) => push(
            "(t.assigned_to = {0} OR t.created_by = {0})".replace("{0}", "{}").as_str(),
            BindValue::BigInt(user_id),
            &mut conditions,
        ),
    }
    if let Some(status) = filter.status {
        push("t.status_id = {}", BindValue::SmallInt(status.id()), &mut conditions);
    }
    if let Some(priority) = filter.priority {
        push("t.priority = {}", BindValue::Text(priority.as_str().to_string()), &mut conditions);
    }
    if let Some(project_id) = filter.project_id {
        push("t.project_id = {}", BindValue::BigInt(project_id), &mut conditions);
    }
    if let Some(assigned_to) = filter.assigned_to {
        push("t.assigned_to = {}", BindValue::BigInt(assigned_to), &mut conditions);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        push(
            "(t.title ILIKE {} OR t.description ILIKE {})",
            BindValue::Text(format!("%{search}%")),
            &mut conditions,
        );
    }

    (format!("WHERE {}", conditions.join(" AND ")), binds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(visibility: TaskVisibility) -> TaskListFilter {
        TaskListFilter {
            visibility,
            status: None,
            priority: None,
            project_id: None,
            assigned_to: None,
            search: None,
            limit: 20,
            offset: 0,
        }
    }

    #[test]
    fn unfiltered_listing_only_hides_inactive() {
        let (clause, binds) = build_task_filter(&filter(TaskVisibility::All));
        assert_eq!(clause, "WHERE t.is_active");
        assert!(binds.is_empty());
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        let mut f = filter(TaskVisibility::AssignedTo(4));
        f.project_id = Some(9);
        f.search = Some("deploy".into());
        let (clause, binds) = build_task_filter(&f);
        assert_eq!(
            clause,
            "WHERE t.is_active AND t.assigned_to = $1 AND t.project_id = $2 \
             AND (t.title ILIKE $3 OR t.description ILIKE $3)"
        );
        assert_eq!(binds.len(), 3);
    }

    #[test]
    fn involving_reuses_one_placeholder() {
        let (clause, binds) = build_task_filter(&filter(TaskVisibility::Involving(7)));
        assert!(clause.contains("(t.assigned_to = $1 OR t.created_by = $1)"));
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut f = filter(TaskVisibility::All);
        f.search = Some("   ".into());
        let (_, binds) = build_task_filter(&f);
        assert!(binds.is_empty());
    }
}
