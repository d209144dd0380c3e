//! Audit trail rows and query parameters.
//!
//! Entries are append-only: there is no update DTO and no `updated_at`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::types::{DbId, Timestamp};

/// A single audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub changes: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub integrity_hash: String,
    pub timestamp: Timestamp,
}

/// DTO for appending an entry. The hash and timestamp are assigned by
/// `AuditLogRepo::append`.
#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub actor_id: Option<DbId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub changes: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Filter parameters for querying audit logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<DbId>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Result of walking the hash chain.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub entries_checked: usize,
    pub valid: bool,
    pub first_broken_id: Option<DbId>,
}
