//! The authenticated actor behind a request.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::roles::Role;
use crate::types::DbId;

/// Identity resolved per request from a verified credential plus the
/// current user row. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(id: DbId, role: Role, department_id: Option<DbId>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            role,
            department_id,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Principal carrying the role's seeded permission set.
    pub fn with_default_permissions(id: DbId, role: Role, department_id: Option<DbId>) -> Self {
        Self::new(
            id,
            role,
            department_id,
            role.default_permissions().iter().copied(),
        )
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// ADMIN satisfies every permission check.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.contains(permission)
    }

    /// True when the principal belongs to `department_id`. A principal
    /// without a department is never in any department's scope.
    pub fn in_department(&self, department_id: Option<DbId>) -> bool {
        matches!((self.department_id, department_id), (Some(mine), Some(theirs)) if mine == theirs)
    }
}
