//! Role model and the permission strings each role is seeded with.
//!
//! The seed lists must match `20260301000002_create_roles.sql`. A user's
//! permission set is read from the `roles` row at request time; these
//! constants exist so the seed, the tests, and the authorization engine
//! agree on spelling.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_USER: &str = "USER";

/// Three-tier role model. ADMIN implicitly satisfies every permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Manager => ROLE_MANAGER,
            Self::User => ROLE_USER,
        }
    }

    /// Parse the `roles.name` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_MANAGER => Ok(Self::Manager),
            ROLE_USER => Ok(Self::User),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }

    /// Permissions granted to the role at assignment time.
    pub fn default_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Admin => ADMIN_PERMISSIONS,
            Self::Manager => MANAGER_PERMISSIONS,
            Self::User => USER_PERMISSIONS,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission string constants referenced by the authorization engine.
pub mod permissions {
    pub const PROJECT_CREATE: &str = "project:create";
    pub const PROJECT_READ: &str = "project:read";
    pub const PROJECT_UPDATE: &str = "project:update";
    pub const PROJECT_DELETE: &str = "project:delete";

    pub const TASK_CREATE: &str = "task:create";
    pub const TASK_READ: &str = "task:read";
    pub const TASK_UPDATE: &str = "task:update";
    pub const TASK_UPDATE_OWN: &str = "task:update-own";
    pub const TASK_CREATE_SUBTASK: &str = "task:create-subtask";
    pub const TASK_DELETE: &str = "task:delete";

    pub const DEPARTMENT_CREATE: &str = "department:create";
    pub const DEPARTMENT_READ: &str = "department:read";
    pub const DEPARTMENT_UPDATE: &str = "department:update";
    pub const DEPARTMENT_DELETE: &str = "department:delete";

    pub const TEAM_CREATE: &str = "team:create";
    pub const TEAM_READ: &str = "team:read";
    pub const TEAM_UPDATE: &str = "team:update";
    pub const TEAM_DELETE: &str = "team:delete";
    pub const TEAM_MANAGE_MEMBERS: &str = "team:manage-members";

    pub const DOCUMENT_UPLOAD: &str = "document:upload";
    pub const DOCUMENT_READ: &str = "document:read";
    pub const DOCUMENT_UPDATE: &str = "document:update";
    pub const DOCUMENT_DELETE: &str = "document:delete";
    pub const DOCUMENT_DELETE_OWN: &str = "document:delete-own";

    pub const TIME_LOG_OWN: &str = "time:log-own";
    pub const TIME_VIEW_OWN: &str = "time:view-own";
    pub const TIMESHEET_APPROVE: &str = "timesheet:approve";

    pub const COMMENT_CREATE: &str = "comment:create";
    pub const COMMENT_READ: &str = "comment:read";

    pub const AUDIT_VIEW: &str = "audit:view";
    pub const AUDIT_PURGE: &str = "audit:purge";

    pub const NOTIFICATION_SEND: &str = "notification:send";
}

const ADMIN_PERMISSIONS: &[&str] = &[
    "user:create",
    "user:read",
    "user:update",
    "user:delete",
    "user:manage-roles",
    "project:create",
    "project:read",
    "project:update",
    "project:delete",
    "project:manage-all",
    "task:create",
    "task:read",
    "task:update",
    "task:delete",
    "task:assign",
    "task:manage-all",
    "department:create",
    "department:read",
    "department:update",
    "department:delete",
    "team:create",
    "team:read",
    "team:update",
    "team:delete",
    "team:manage-all",
    "team:manage-members",
    "document:upload",
    "document:read",
    "document:update",
    "document:delete",
    "document:manage-all",
    "time:log-own",
    "time:view-own",
    "timesheet:approve",
    "comment:create",
    "comment:read",
    "audit:view",
    "audit:export",
    "audit:purge",
    "notification:send",
    "system:manage-settings",
    "system:manage-roles",
];

const MANAGER_PERMISSIONS: &[&str] = &[
    "user:read",
    "user:view-team",
    "project:create",
    "project:read",
    "project:update",
    "project:manage-own",
    "task:create",
    "task:read",
    "task:update",
    "task:delete",
    "task:assign",
    "task:manage-team",
    "department:read",
    "team:read",
    "team:manage-members",
    "document:upload",
    "document:read",
    "document:update",
    "document:delete",
    "report:view-team",
    "report:export",
    "timesheet:approve",
    "time:log-own",
    "time:view-own",
    "comment:create",
    "comment:read",
];

const USER_PERMISSIONS: &[&str] = &[
    "user:read-own",
    "user:update-own",
    "project:read",
    "task:read",
    "task:update-own",
    "task:create-subtask",
    "document:upload",
    "document:read",
    "document:delete-own",
    "time:log-own",
    "time:view-own",
    "comment:create",
    "comment:read",
    "comment:delete-own",
    "notification:read-own",
];
