use crate::authz::DenyReason;
use crate::types::DbId;

/// Which invariant a [`CoreError::Conflict`] violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The user already has a RUNNING time log.
    AlreadyRunning,
    /// The time log was already stopped.
    AlreadyStopped,
    /// The dependency is already present on the task.
    DuplicateDependency,
    /// The new parent is the task itself or one of its descendants.
    CyclicParent,
    /// The dependency would close a transitive dependency cycle.
    CyclicDependency,
    /// A task cannot depend on itself.
    SelfReference,
    /// The user is already a member of the project or team.
    DuplicateMember,
    /// A unique field (name, code) is already taken.
    DuplicateValue,
    /// The row changed between read and conditional write.
    ConcurrentUpdate,
}

impl ConflictKind {
    /// Stable symbolic code used in API responses.
    pub fn code(self) -> &'static str {
        match self {
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::AlreadyStopped => "ALREADY_STOPPED",
            Self::DuplicateDependency => "DUPLICATE_DEPENDENCY",
            Self::CyclicParent => "CYCLIC_PARENT",
            Self::CyclicDependency => "CYCLIC_DEPENDENCY",
            Self::SelfReference => "SELF_REFERENCE",
            Self::DuplicateMember => "DUPLICATE_MEMBER",
            Self::DuplicateValue => "DUPLICATE_VALUE",
            Self::ConcurrentUpdate => "CONCURRENT_UPDATE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },

    #[error("Denied: {0}")]
    Denied(DenyReason),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The domain mutation committed but its audit entry did not.
    #[error("Audit write failed after {action} on {entity_type} committed: {message}")]
    AuditWriteFailed {
        action: String,
        entity_type: String,
        entity_id: Option<DbId>,
        message: String,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for building a [`CoreError::Conflict`].
    pub fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            message: message.into(),
        }
    }

    /// Stable symbolic kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::Denied(_) => "DENIED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::AuditWriteFailed { .. } => "AUDIT_WRITE_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Only transient store failures are safe for the caller to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
