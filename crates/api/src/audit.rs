//! Records audit entries for committed mutations.
//!
//! Handlers call [`AuditRecorder::record`] after the mutation has
//! committed. A failure at that point cannot be rolled back, so it is
//! logged at `error` level and surfaced as `AuditWriteFailed`.

use taskforge_core::audit::AuditChanges;
use taskforge_core::error::CoreError;
use taskforge_core::types::DbId;
use taskforge_db::models::audit::{AuditLog, CreateAuditLog};
use taskforge_db::repositories::AuditLogRepo;
use taskforge_db::DbPool;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;

/// Who performed a mutation and from where.
#[derive(Debug, Clone)]
pub struct AuditActor {
    pub actor_id: Option<DbId>,
    pub client: ClientInfo,
}

impl AuditActor {
    pub fn new(user: &AuthUser, client: &ClientInfo) -> Self {
        Self {
            actor_id: Some(user.id()),
            client: client.clone(),
        }
    }
}

pub struct AuditRecorder;

impl AuditRecorder {
    /// Append one entry for a mutation that already committed.
    ///
    /// `changes` is taken as a `Result` so a snapshot that failed to
    /// serialize is reported the same way as a failed insert.
    pub async fn record(
        pool: &DbPool,
        actor: &AuditActor,
        action: &str,
        entity_type: &str,
        entity_id: Option<DbId>,
        changes: Result<AuditChanges, CoreError>,
    ) -> AppResult<AuditLog> {
        let failed = |message: String| {
            tracing::error!(
                action,
                entity_type,
                entity_id = ?entity_id,
                actor_id = actor.actor_id,
                error = %message,
                "Audit write failed after mutation committed"
            );
            CoreError::AuditWriteFailed {
                action: action.to_string(),
                entity_type: entity_type.to_string(),
                entity_id,
                message,
            }
        };

        let changes = changes.map_err(|e| failed(e.to_string()))?;
        let entry = CreateAuditLog {
            actor_id: actor.actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            changes: changes.into_value(),
            ip_address: actor.client.ip_address.clone(),
            user_agent: actor.client.user_agent.clone(),
        };

        let log = AuditLogRepo::append(pool, &entry, chrono::Utc::now())
            .await
            .map_err(|e| failed(e.to_string()))?;

        tracing::debug!(audit_id = log.id, action, entity_type, entity_id = ?entity_id, "Audit entry recorded");
        Ok(log)
    }
}
