//! Timer arithmetic and stop preconditions.

use crate::authz::DenyReason;
use crate::error::{ConflictKind, CoreError};
use crate::status::TimeLogStatus;
use crate::types::{DbId, Timestamp};

/// Whole minutes between `start` and `end`, rounded to nearest.
///
/// A negative span (clock skew) yields zero.
pub fn duration_minutes(start: Timestamp, end: Timestamp) -> i32 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let minutes = (millis as f64 / 60_000.0).round();
    minutes.min(i32::MAX as f64) as i32
}

/// Hours to add to a task's `actual_hours` for a stopped timer.
pub fn hours_from_minutes(minutes: i32) -> f64 {
    f64::from(minutes) / 60.0
}

/// Check that `caller_id` may stop the log and that it is still running.
///
/// Ownership is checked first and applies to every role.
pub fn ensure_stoppable(
    log_id: DbId,
    owner_id: DbId,
    status: TimeLogStatus,
    caller_id: DbId,
) -> Result<(), CoreError> {
    if owner_id != caller_id {
        return Err(CoreError::Denied(DenyReason::NotOwner));
    }
    if status != TimeLogStatus::Running {
        return Err(already_stopped(log_id));
    }
    Ok(())
}

pub fn already_stopped(log_id: DbId) -> CoreError {
    CoreError::conflict(
        ConflictKind::AlreadyStopped,
        format!("Time log {log_id} is not running"),
    )
}

pub fn already_running(running_log_id: Option<DbId>) -> CoreError {
    let message = match running_log_id {
        Some(id) => format!("A timer is already running (time log {id})"),
        None => "A timer is already running".to_string(),
    };
    CoreError::conflict(ConflictKind::AlreadyRunning, message)
}
