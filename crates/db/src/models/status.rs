//! Serde helpers that render SMALLINT status ids as their symbolic names.

use serde::Serializer;
use taskforge_core::status::{ProjectStatus, StatusId, TaskStatus, TimeLogStatus};

pub fn task_status<S: Serializer>(id: &StatusId, serializer: S) -> Result<S::Ok, S::Error> {
    let status = TaskStatus::from_id(*id).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(status.as_str())
}

pub fn time_log_status<S: Serializer>(id: &StatusId, serializer: S) -> Result<S::Ok, S::Error> {
    let status = TimeLogStatus::from_id(*id).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(status.as_str())
}

pub fn project_status<S: Serializer>(id: &StatusId, serializer: S) -> Result<S::Ok, S::Error> {
    let status = ProjectStatus::from_id(*id).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(status.as_str())
}
