//! Repository for the `time_logs` table.
//!
//! The partial unique index `uq_time_logs_running_per_user` keeps at most
//! one RUNNING log per user; `start` relies on it instead of a read-check.

use sqlx::PgPool;
use taskforge_core::error::CoreError;
use taskforge_core::status::TimeLogStatus;
use taskforge_core::time_tracking;
use taskforge_core::types::{DbId, Timestamp};

use crate::error::{unique_violation, RepoError};
use crate::models::time_log::{StartTimer, TimeLog};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, task_id, project_id, description, start_time, end_time, \
    duration_minutes, is_billable, status_id, created_at, updated_at";

const RUNNING_INDEX: &str = "uq_time_logs_running_per_user";

pub struct TimeLogRepo;

impl TimeLogRepo {
    /// Open a RUNNING log for `user_id` on `project_id`'s task.
    ///
    /// A second concurrent start for the same user loses on the partial
    /// unique index and is reported as `AlreadyRunning`.
    pub async fn start(
        pool: &PgPool,
        user_id: DbId,
        project_id: DbId,
        input: &StartTimer,
        now: Timestamp,
    ) -> Result<TimeLog, RepoError> {
        let query = format!(
            "INSERT INTO time_logs \
                (user_id, task_id, project_id, description, start_time, is_billable, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, TimeLog>(&query)
            .bind(user_id)
            .bind(input.task_id)
            .bind(project_id)
            .bind(&input.description)
            .bind(now)
            .bind(input.is_billable.unwrap_or(true))
            .bind(TimeLogStatus::Running.id())
            .fetch_one(pool)
            .await;

        match inserted {
            Ok(log) => Ok(log),
            Err(err) if unique_violation(&err).as_deref() == Some(RUNNING_INDEX) => {
                let running = Self::find_running(pool, user_id).await?;
                Err(time_tracking::already_running(running.map(|log| log.id)).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stop a RUNNING log and roll its duration into the task and project.
    ///
    /// The log row is locked for the whole transaction, so of two
    /// concurrent stops exactly one adds hours and the other sees
    /// `AlreadyStopped`.
    pub async fn stop(
        pool: &PgPool,
        log_id: DbId,
        caller_id: DbId,
        now: Timestamp,
    ) -> Result<TimeLog, RepoError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM time_logs WHERE id = $1 FOR UPDATE");
        let log = sqlx::query_as::<_, TimeLog>(&query)
            .bind(log_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "TimeLog",
                id: log_id,
            })?;

        let status = TimeLogStatus::from_id(log.status_id)?;
        time_tracking::ensure_stoppable(log.id, log.user_id, status, caller_id)?;

        let minutes = time_tracking::duration_minutes(log.start_time, now);
        let query = format!(
            "UPDATE time_logs SET end_time = $2, duration_minutes = $3, status_id = $4 \
             WHERE id = $1 AND status_id = $5 \
             RETURNING {COLUMNS}"
        );
        let stopped = sqlx::query_as::<_, TimeLog>(&query)
            .bind(log.id)
            .bind(now)
            .bind(minutes)
            .bind(TimeLogStatus::Stopped.id())
            .bind(TimeLogStatus::Running.id())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| time_tracking::already_stopped(log.id))?;

        let hours = time_tracking::hours_from_minutes(minutes);
        sqlx::query("UPDATE tasks SET actual_hours = actual_hours + $2 WHERE id = $1")
            .bind(stopped.task_id)
            .bind(hours)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE projects SET actual_hours = actual_hours + $2 WHERE id = $1")
            .bind(stopped.project_id)
            .bind(hours)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stopped)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TimeLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM time_logs WHERE id = $1");
        sqlx::query_as::<_, TimeLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's RUNNING log, if any.
    pub async fn find_running(pool: &PgPool, user_id: DbId) -> Result<Option<TimeLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM time_logs WHERE user_id = $1 AND status_id = $2");
        sqlx::query_as::<_, TimeLog>(&query)
            .bind(user_id)
            .bind(TimeLogStatus::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// The user's logs, most recent start first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TimeLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_logs WHERE user_id = $1 \
             ORDER BY start_time DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, TimeLog>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM time_logs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }
}
