//! Repository for the `task_attachments` table. File bytes live outside
//! the database; only the stored path is recorded here.

use sqlx::PgPool;
use taskforge_core::types::DbId;

use crate::models::task::{CreateAttachment, TaskAttachment};

const COLUMNS: &str = "id, task_id, filename, path, size_bytes, mimetype, uploaded_by, uploaded_at";

pub struct AttachmentRepo;

impl AttachmentRepo {
    pub async fn create(pool: &PgPool, input: &CreateAttachment) -> Result<TaskAttachment, sqlx::Error> {
        let query = format!(
            "INSERT INTO task_attachments (task_id, filename, path, size_bytes, mimetype, uploaded_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskAttachment>(&query)
            .bind(input.task_id)
            .bind(&input.filename)
            .bind(&input.path)
            .bind(input.size_bytes)
            .bind(&input.mimetype)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TaskAttachment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_attachments WHERE id = $1");
        sqlx::query_as::<_, TaskAttachment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an attachment on a specific task.
    pub async fn find_for_task(
        pool: &PgPool,
        task_id: DbId,
        attachment_id: DbId,
    ) -> Result<Option<TaskAttachment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_attachments WHERE id = $1 AND task_id = $2");
        sqlx::query_as::<_, TaskAttachment>(&query)
            .bind(attachment_id)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_task(pool: &PgPool, task_id: DbId) -> Result<Vec<TaskAttachment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_attachments WHERE task_id = $1 ORDER BY uploaded_at, id");
        sqlx::query_as::<_, TaskAttachment>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Hard delete. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
