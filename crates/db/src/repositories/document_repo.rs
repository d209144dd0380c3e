//! Repository for the `documents` table.
//!
//! Only the head of each version chain is active; superseded and deleted
//! rows stay behind for history.

use sqlx::PgPool;
use taskforge_core::document::DocumentCategory;
use taskforge_core::types::DbId;

use crate::models::document::{CreateDocument, Document, DocumentListFilter, NewDocumentVersion};
use crate::repositories::project_repo::visibility_binds;

const COLUMNS: &str = "\
    id, project_id, task_id, filename, path, size_bytes, mimetype, uploaded_by, category, \
    tags, version, previous_version_id, is_active, created_at, updated_at";

/// `$1` department, `$2` user, `$3` project, `$4` task, `$5` category.
const FILTER_CLAUSE: &str = "\
    d.is_active \
    AND ($3::BIGINT IS NULL OR d.project_id = $3) \
    AND ($4::BIGINT IS NULL OR d.task_id = $4) \
    AND ($5::TEXT IS NULL OR d.category = $5) \
    AND ($2::BIGINT IS NULL OR EXISTS ( \
        SELECT 1 FROM projects p \
        WHERE p.id = d.project_id \
          AND (p.department_id = $1::BIGINT \
               OR p.manager_id = $2 \
               OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $2))))";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents \
                (project_id, task_id, filename, path, size_bytes, mimetype, uploaded_by, category, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(input.task_id)
            .bind(&input.filename)
            .bind(&input.path)
            .bind(input.size_bytes)
            .bind(&input.mimetype)
            .bind(input.uploaded_by)
            .bind(input.category.as_str())
            .bind(&input.tags)
            .fetch_one(pool)
            .await
    }

    /// Find an active document by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &DocumentListFilter) -> Result<Vec<Document>, sqlx::Error> {
        let (dept, user) = visibility_binds(filter.visibility);
        let query = format!(
            "SELECT {COLUMNS} FROM documents d WHERE {FILTER_CLAUSE} \
             ORDER BY d.created_at DESC, d.id DESC \
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(dept)
            .bind(user)
            .bind(filter.project_id)
            .bind(filter.task_id)
            .bind(filter.category.map(DocumentCategory::as_str))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, filter: &DocumentListFilter) -> Result<i64, sqlx::Error> {
        let (dept, user) = visibility_binds(filter.visibility);
        let query = format!("SELECT COUNT(*)::BIGINT FROM documents d WHERE {FILTER_CLAUSE}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(dept)
            .bind(user)
            .bind(filter.project_id)
            .bind(filter.task_id)
            .bind(filter.category.map(DocumentCategory::as_str))
            .fetch_one(pool)
            .await
    }

    /// Insert the next version of an active document and deactivate the
    /// current one in one transaction.
    ///
    /// Returns `None` when `id` is no longer the active head, for example
    /// because a concurrent update already superseded it.
    pub async fn new_version(
        pool: &PgPool,
        id: DbId,
        input: &NewDocumentVersion,
    ) -> Result<Option<Document>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let superseded = sqlx::query("UPDATE documents SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if superseded.rows_affected() == 0 {
            return Ok(None);
        }

        let file = input.file.as_ref();
        let query = format!(
            "INSERT INTO documents \
                (project_id, task_id, filename, path, size_bytes, mimetype, uploaded_by, \
                 category, tags, version, previous_version_id) \
             SELECT project_id, task_id, \
                    COALESCE($2, filename), COALESCE($3, path), COALESCE($4, size_bytes), \
                    COALESCE($5, mimetype), $6, COALESCE($7, category), COALESCE($8, tags), \
                    version + 1, id \
             FROM documents WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let document = sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(file.map(|f| f.filename.as_str()))
            .bind(file.map(|f| f.path.as_str()))
            .bind(file.map(|f| f.size_bytes))
            .bind(file.map(|f| f.mimetype.as_str()))
            .bind(input.uploaded_by)
            .bind(input.category.map(DocumentCategory::as_str))
            .bind(&input.tags)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(document))
    }

    /// Soft-delete. Returns `true` if a row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE documents SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
