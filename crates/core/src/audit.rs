//! Audit trail vocabulary, change snapshots and the integrity hash chain.
//!
//! Lives in `core` so the repository layer and the API layer agree on
//! action names, entity names and the canonical form that gets hashed.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CoreError;
use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action and entity names
// ---------------------------------------------------------------------------

pub mod actions {
    pub const CREATE_TASK: &str = "CREATE_TASK";
    pub const UPDATE_TASK: &str = "UPDATE_TASK";
    pub const UPDATE_TASK_STATUS: &str = "UPDATE_TASK_STATUS";
    pub const DELETE_TASK: &str = "DELETE_TASK";
    pub const ADD_SUBTASK: &str = "ADD_SUBTASK";
    pub const REMOVE_SUBTASK: &str = "REMOVE_SUBTASK";
    pub const ADD_DEPENDENCY: &str = "ADD_DEPENDENCY";
    pub const REMOVE_DEPENDENCY: &str = "REMOVE_DEPENDENCY";
    pub const UPLOAD_ATTACHMENT: &str = "UPLOAD_ATTACHMENT";
    pub const DELETE_ATTACHMENT: &str = "DELETE_ATTACHMENT";
    pub const CREATE_COMMENT: &str = "CREATE_COMMENT";

    pub const UPLOAD_DOCUMENT: &str = "UPLOAD_DOCUMENT";
    pub const UPDATE_DOCUMENT: &str = "UPDATE_DOCUMENT";
    pub const DELETE_DOCUMENT: &str = "DELETE_DOCUMENT";

    pub const START_TIMER: &str = "START_TIMER";
    pub const STOP_TIMER: &str = "STOP_TIMER";

    pub const CREATE_PROJECT: &str = "CREATE_PROJECT";
    pub const UPDATE_PROJECT: &str = "UPDATE_PROJECT";
    pub const DELETE_PROJECT: &str = "DELETE_PROJECT";
    pub const ADD_PROJECT_MEMBER: &str = "ADD_PROJECT_MEMBER";
    pub const REMOVE_PROJECT_MEMBER: &str = "REMOVE_PROJECT_MEMBER";

    pub const CREATE_DEPARTMENT: &str = "CREATE_DEPARTMENT";
    pub const UPDATE_DEPARTMENT: &str = "UPDATE_DEPARTMENT";
    pub const DELETE_DEPARTMENT: &str = "DELETE_DEPARTMENT";

    pub const CREATE_TEAM: &str = "CREATE_TEAM";
    pub const UPDATE_TEAM: &str = "UPDATE_TEAM";
    pub const DELETE_TEAM: &str = "DELETE_TEAM";
    pub const ADD_TEAM_MEMBER: &str = "ADD_TEAM_MEMBER";
    pub const REMOVE_TEAM_MEMBER: &str = "REMOVE_TEAM_MEMBER";

    pub const SEND_NOTIFICATION: &str = "SEND_NOTIFICATION";
    pub const CLEANUP_AUDIT_LOGS: &str = "CLEANUP_AUDIT_LOGS";
}

pub mod entities {
    pub const TASK: &str = "Task";
    pub const TIME_LOG: &str = "TimeLog";
    pub const PROJECT: &str = "Project";
    pub const DEPARTMENT: &str = "Department";
    pub const TEAM: &str = "Team";
    pub const COMMENT: &str = "Comment";
    pub const DOCUMENT: &str = "Document";
    pub const NOTIFICATION: &str = "Notification";
    pub const AUDIT_LOG: &str = "AuditLog";
}

// ---------------------------------------------------------------------------
// Query and retention limits
// ---------------------------------------------------------------------------

pub const DEFAULT_AUDIT_PAGE_SIZE: i64 = 50;
pub const MAX_AUDIT_PAGE_SIZE: i64 = 500;
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

pub fn validate_retention_days(days: i64) -> Result<(), CoreError> {
    if days < 1 {
        return Err(CoreError::Validation(
            "Retention days must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Change snapshots
// ---------------------------------------------------------------------------

/// The `changes` payload of an entry.
///
/// Snapshots are serialized values taken before and after the mutation so
/// later edits to the entity never leak into a recorded entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditChanges {
    Created(Value),
    Updated { old: Value, new: Value },
    Deleted(Value),
    /// Operation-specific object such as `{"addedMember": {...}}`.
    Custom(Value),
}

impl AuditChanges {
    pub fn created<T: Serialize>(entity: &T) -> Result<Self, CoreError> {
        Ok(Self::Created(snapshot(entity)?))
    }

    pub fn updated<O: Serialize, N: Serialize>(old: &O, new: &N) -> Result<Self, CoreError> {
        Ok(Self::Updated {
            old: snapshot(old)?,
            new: snapshot(new)?,
        })
    }

    pub fn deleted<T: Serialize>(entity: &T) -> Result<Self, CoreError> {
        Ok(Self::Deleted(snapshot(entity)?))
    }

    /// Wrap `value` under a single key.
    pub fn custom<T: Serialize>(key: &str, value: &T) -> Result<Self, CoreError> {
        Ok(Self::Custom(json!({ key: snapshot(value)? })))
    }

    /// JSON stored in the `changes` column, with sensitive keys redacted.
    pub fn into_value(self) -> Value {
        let raw = match self {
            Self::Created(v) => json!({ "created": v }),
            Self::Updated { old, new } => json!({ "old": old, "new": new }),
            Self::Deleted(v) => json!({ "deleted": v }),
            Self::Custom(v) => v,
        };
        redact_sensitive_fields(&raw)
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Internal(format!("Failed to snapshot entity for audit: {e}")))
}

// ---------------------------------------------------------------------------
// Integrity hash chain
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "AUDIT_LOG_CHAIN_SEED_V1";

/// SHA-256 over the previous entry's hash and this entry's canonical data.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

/// Canonical string hashed for one entry.
///
/// `serde_json` keeps object keys sorted, so the same logical `changes`
/// always serializes the same way.
pub fn canonical_entry_data(
    actor_id: Option<DbId>,
    action: &str,
    entity_type: &str,
    entity_id: Option<DbId>,
    changes: &Value,
    timestamp: Timestamp,
) -> String {
    json!({
        "actor_id": actor_id,
        "action": action,
        "entity_type": entity_type,
        "entity_id": entity_id,
        "changes": changes,
        "timestamp": timestamp.timestamp_micros(),
    })
    .to_string()
}

/// Walk entries oldest first and return the id of the first entry whose
/// stored hash does not match its recomputed hash.
///
/// Each item is `(id, canonical_data, stored_hash)`. The first entry may
/// chain from a purged predecessor, so its stored hash is trusted as the
/// anchor when `anchor_is_trusted` is set.
pub fn find_chain_break<'a, I>(entries: I, anchor_is_trusted: bool) -> Option<DbId>
where
    I: IntoIterator<Item = (DbId, &'a str, &'a str)>,
{
    let mut prev: Option<&str> = None;
    for (index, (id, data, stored)) in entries.into_iter().enumerate() {
        let trusted = index == 0 && anchor_is_trusted;
        if !trusted && compute_integrity_hash(prev, data) != stored {
            return Some(id);
        }
        prev = Some(stored);
    }
    None
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Key fragments whose values never reach the audit table.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "private_key",
    "authorization",
    "credential",
    "otp",
];

/// Replace the value of any key matching [`SENSITIVE_FIELDS`] with
/// `"[REDACTED]"`, recursing into objects and arrays.
pub fn redact_sensitive_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_FIELDS.iter().any(|f| lower.contains(f)) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_sensitive_fields(val))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_fields).collect()),
        other => other.clone(),
    }
}
