use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::status::StatusId;
use taskforge_core::types::{DbId, Timestamp};

use crate::models::status::time_log_status;

/// A row from the `time_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeLog {
    pub id: DbId,
    pub user_id: DbId,
    pub task_id: DbId,
    pub project_id: DbId,
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_minutes: i32,
    pub is_billable: bool,
    #[serde(rename = "status", serialize_with = "time_log_status")]
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartTimer {
    pub task_id: DbId,
    pub description: Option<String>,
    pub is_billable: Option<bool>,
}
