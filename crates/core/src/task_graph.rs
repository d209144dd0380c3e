//! Task workflow and graph rules.
//!
//! Status changes follow an advisory workflow: any transition is allowed
//! except DONE -> CANCELLED, entering DONE stamps `completed_at` when it is
//! unset, and only leaving DONE clears it. Parent links must never form a
//! cycle. Dependencies reject self-reference and duplicates; transitive
//! cycle detection is available for callers that opt in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{ConflictKind, CoreError};
use crate::status::TaskStatus;
use crate::types::{DbId, Timestamp};

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(CoreError::Validation(format!(
                "Invalid priority '{other}'. Must be one of: LOW, MEDIUM, HIGH, CRITICAL"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Status machine
// ---------------------------------------------------------------------------

/// Compute the `completed_at` value that must accompany a status change.
///
/// A repeated transition into DONE keeps the original stamp.
pub fn apply_status(
    current: TaskStatus,
    completed_at: Option<Timestamp>,
    next: TaskStatus,
    now: Timestamp,
) -> Result<Option<Timestamp>, CoreError> {
    if current == TaskStatus::Done && next == TaskStatus::Cancelled {
        return Err(CoreError::InvalidTransition(
            "A completed task cannot be cancelled".to_string(),
        ));
    }

    Ok(match next {
        TaskStatus::Done => completed_at.or(Some(now)),
        _ => None,
    })
}

/// True when the change is the first entry into DONE.
pub fn is_completion(current: TaskStatus, next: TaskStatus) -> bool {
    current != TaskStatus::Done && next == TaskStatus::Done
}

pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Task title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Task title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_hours(field: &str, hours: Option<f64>) -> Result<(), CoreError> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(CoreError::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Reject a parent link that would make `task_id` its own ancestor.
///
/// `parent_ancestors` is the parent's chain upward, nearest first, not
/// including the parent itself.
pub fn validate_parent(task_id: DbId, parent_id: DbId, parent_ancestors: &[DbId]) -> Result<(), CoreError> {
    if task_id == parent_id {
        return Err(CoreError::conflict(
            ConflictKind::CyclicParent,
            format!("Task {task_id} cannot be its own parent"),
        ));
    }
    if parent_ancestors.contains(&task_id) {
        return Err(CoreError::conflict(
            ConflictKind::CyclicParent,
            format!("Task {parent_id} is a descendant of task {task_id}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

pub fn validate_dependency(task_id: DbId, dependency_id: DbId, existing: &[DbId]) -> Result<(), CoreError> {
    if task_id == dependency_id {
        return Err(CoreError::conflict(
            ConflictKind::SelfReference,
            format!("Task {task_id} cannot depend on itself"),
        ));
    }
    if existing.contains(&dependency_id) {
        return Err(duplicate_dependency(task_id, dependency_id));
    }
    Ok(())
}

pub fn duplicate_dependency(task_id: DbId, dependency_id: DbId) -> CoreError {
    CoreError::conflict(
        ConflictKind::DuplicateDependency,
        format!("Task {task_id} already depends on task {dependency_id}"),
    )
}

pub fn dependency_cycle(task_id: DbId, dependency_id: DbId) -> CoreError {
    CoreError::conflict(
        ConflictKind::CyclicDependency,
        format!("Task {dependency_id} already depends on task {task_id} transitively"),
    )
}

/// Would adding `task_id -> dependency_id` close a cycle?
///
/// `edges` maps each task to the tasks it depends on; it only needs to
/// cover what is reachable from `dependency_id`.
pub fn would_create_dependency_cycle(
    task_id: DbId,
    dependency_id: DbId,
    edges: &BTreeMap<DbId, Vec<DbId>>,
) -> bool {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([dependency_id]);

    while let Some(current) = queue.pop_front() {
        if current == task_id {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = edges.get(&current) {
            queue.extend(next.iter().copied());
        }
    }
    false
}
