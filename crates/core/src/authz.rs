//! Authorization engine.
//!
//! [`authorize`] is a pure decision over a [`Principal`], an [`Action`] and a
//! [`Resource`] snapshot. Rules are evaluated in order:
//!
//! 1. ADMIN is always allowed.
//! 2. Each `(resource kind, action)` pair names an any-of permission list.
//!    A principal without one of them is denied unless an ownership
//!    override ([`Scope::Owner`]) applies.
//! 3. A principal holding the permission is allowed only when the resource
//!    is within their organizational scope.
//! 4. Otherwise the decision is `Deny(InsufficientScope)`.
//!
//! Snapshots are plain values loaded by the caller before the mutation.
//! Existence checks happen before calling in here, so a missing entity is
//! reported as not-found rather than masked as a denial.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::principal::Principal;
use crate::roles::{permissions as perm, Role};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Actions and resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    UpdateStatus,
    Delete,
    AddMember,
    RemoveMember,
    ManageHierarchy,
    ManageDependencies,
    UploadAttachment,
    DeleteAttachment,
    Comment,
    StartTimer,
    StopTimer,
    ViewAudit,
    PurgeAudit,
}

impl Action {
    pub const ALL: &'static [Action] = &[
        Action::Create,
        Action::Read,
        Action::Update,
        Action::UpdateStatus,
        Action::Delete,
        Action::AddMember,
        Action::RemoveMember,
        Action::ManageHierarchy,
        Action::ManageDependencies,
        Action::UploadAttachment,
        Action::DeleteAttachment,
        Action::Comment,
        Action::StartTimer,
        Action::StopTimer,
        Action::ViewAudit,
        Action::PurgeAudit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::UpdateStatus => "update_status",
            Self::Delete => "delete",
            Self::AddMember => "add_member",
            Self::RemoveMember => "remove_member",
            Self::ManageHierarchy => "manage_hierarchy",
            Self::ManageDependencies => "manage_dependencies",
            Self::UploadAttachment => "upload_attachment",
            Self::DeleteAttachment => "delete_attachment",
            Self::Comment => "comment",
            Self::StartTimer => "start_timer",
            Self::StopTimer => "stop_timer",
            Self::ViewAudit => "view_audit",
            Self::PurgeAudit => "purge_audit",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| CoreError::Validation(format!("Unknown action '{value}'")))
    }
}

/// Entity type names as they appear in audit entries and the authz check API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Department,
    Project,
    ProjectMember,
    Task,
    Attachment,
    Document,
    TimeLog,
    Team,
    TeamMember,
    AuditLog,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Department => "Department",
            Self::Project => "Project",
            Self::ProjectMember => "ProjectMember",
            Self::Task => "Task",
            Self::Attachment => "Attachment",
            Self::Document => "Document",
            Self::TimeLog => "TimeLog",
            Self::Team => "Team",
            Self::TeamMember => "TeamMember",
            Self::AuditLog => "AuditLog",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "Department" => Ok(Self::Department),
            "Project" => Ok(Self::Project),
            "ProjectMember" => Ok(Self::ProjectMember),
            "Task" => Ok(Self::Task),
            "Attachment" => Ok(Self::Attachment),
            "Document" => Ok(Self::Document),
            "TimeLog" => Ok(Self::TimeLog),
            "Team" => Ok(Self::Team),
            "TeamMember" => Ok(Self::TeamMember),
            "AuditLog" => Ok(Self::AuditLog),
            other => Err(CoreError::Validation(format!("Unknown entity type '{other}'"))),
        }
    }
}

/// Organizational facts about a project needed for scope decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope {
    pub department_id: Option<DbId>,
    pub manager_id: DbId,
    pub member_ids: Vec<DbId>,
}

impl ProjectScope {
    fn involves(&self, user_id: DbId) -> bool {
        self.manager_id == user_id || self.member_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScope {
    pub project: ProjectScope,
    pub assignee_id: Option<DbId>,
    pub creator_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamScope {
    pub department_id: Option<DbId>,
    pub leader_id: Option<DbId>,
    pub member_ids: Vec<DbId>,
}

/// Snapshot of the entity an action targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `id` is `None` when creating or listing.
    Department { id: Option<DbId> },
    Project(ProjectScope),
    ProjectMember {
        project: ProjectScope,
        member_department_id: Option<DbId>,
    },
    Task(TaskScope),
    Attachment { task: TaskScope, uploaded_by: DbId },
    /// A project document. Create uses the target project's scope.
    Document(ProjectScope),
    TimeLog { owner_id: DbId, task: TaskScope },
    Team(TeamScope),
    TeamMember {
        team: TeamScope,
        member_department_id: Option<DbId>,
    },
    AuditLog,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Department { .. } => ResourceKind::Department,
            Self::Project(_) => ResourceKind::Project,
            Self::ProjectMember { .. } => ResourceKind::ProjectMember,
            Self::Task(_) => ResourceKind::Task,
            Self::Attachment { .. } => ResourceKind::Attachment,
            Self::Document(_) => ResourceKind::Document,
            Self::TimeLog { .. } => ResourceKind::TimeLog,
            Self::Team(_) => ResourceKind::Team,
            Self::TeamMember { .. } => ResourceKind::TeamMember,
            Self::AuditLog => ResourceKind::AuditLog,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "permission", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    MissingPermission(&'static str),
    InsufficientScope,
    /// Only the owner of a time log may stop it, ADMIN included.
    NotOwner,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPermission(p) => write!(f, "missing permission: {p}"),
            Self::InsufficientScope => f.write_str("insufficient scope"),
            Self::NotOwner => f.write_str("not the owner"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert a denial into [`CoreError::Denied`].
    pub fn into_result(self) -> Result<(), CoreError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(CoreError::Denied(reason)),
        }
    }
}

/// How the principal relates to a resource, independent of permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Ownership override: grants access even without the permission.
    Owner,
    /// Within the principal's organizational boundary.
    InScope,
    OutOfScope,
}

impl Scope {
    fn from_bool(in_scope: bool) -> Self {
        if in_scope {
            Self::InScope
        } else {
            Self::OutOfScope
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate whether `principal` may perform `action` on `resource`.
pub fn authorize(principal: &Principal, action: Action, resource: &Resource) -> Decision {
    if principal.is_admin() {
        return Decision::Allow;
    }

    let Some(required) = required_permissions(resource.kind(), action) else {
        return Decision::Deny(DenyReason::InsufficientScope);
    };
    let has_permission = required.iter().any(|p| principal.has_permission(p));

    match (has_permission, evaluate_scope(principal, action, resource)) {
        (_, Scope::Owner) => Decision::Allow,
        (true, Scope::InScope) => Decision::Allow,
        (true, Scope::OutOfScope) => Decision::Deny(DenyReason::InsufficientScope),
        (false, _) => Decision::Deny(DenyReason::MissingPermission(required[0])),
    }
}

/// Any-of permission list for a `(kind, action)` pair, or `None` when the
/// action does not apply to that kind of resource.
pub fn required_permissions(kind: ResourceKind, action: Action) -> Option<&'static [&'static str]> {
    use Action as A;
    use ResourceKind as K;

    let list: &'static [&'static str] = match (kind, action) {
        (K::Department, A::Create) => &[perm::DEPARTMENT_CREATE],
        (K::Department, A::Read) => &[perm::DEPARTMENT_READ],
        (K::Department, A::Update) => &[perm::DEPARTMENT_UPDATE],
        (K::Department, A::Delete) => &[perm::DEPARTMENT_DELETE],

        (K::Project, A::Create) => &[perm::PROJECT_CREATE],
        (K::Project, A::Read) => &[perm::PROJECT_READ],
        (K::Project, A::Update) => &[perm::PROJECT_UPDATE],
        (K::Project, A::Delete) => &[perm::PROJECT_DELETE],
        (K::ProjectMember, A::AddMember | A::RemoveMember) => &[perm::PROJECT_UPDATE],

        (K::Task, A::Create) => &[perm::TASK_CREATE],
        (K::Task, A::Read) => &[perm::TASK_READ],
        (K::Task, A::Update | A::ManageDependencies) => &[perm::TASK_UPDATE],
        (K::Task, A::UpdateStatus) => &[perm::TASK_UPDATE, perm::TASK_UPDATE_OWN],
        (K::Task, A::Delete) => &[perm::TASK_DELETE],
        (K::Task, A::ManageHierarchy) => &[perm::TASK_UPDATE, perm::TASK_CREATE_SUBTASK],
        (K::Task, A::UploadAttachment) => &[perm::DOCUMENT_UPLOAD],
        (K::Task, A::Comment) => &[perm::COMMENT_CREATE],

        (K::Attachment, A::Read) => &[perm::TASK_READ],
        (K::Attachment, A::DeleteAttachment) => {
            &[perm::DOCUMENT_DELETE, perm::DOCUMENT_DELETE_OWN]
        }

        (K::Document, A::Create) => &[perm::DOCUMENT_UPLOAD],
        (K::Document, A::Read) => &[perm::DOCUMENT_READ],
        (K::Document, A::Update) => &[perm::DOCUMENT_UPDATE],
        (K::Document, A::Delete) => &[perm::DOCUMENT_DELETE],

        (K::TimeLog, A::Read) => &[perm::TIME_VIEW_OWN, perm::TIMESHEET_APPROVE],
        (K::TimeLog, A::StartTimer | A::StopTimer) => &[perm::TIME_LOG_OWN],

        (K::Team, A::Create) => &[perm::TEAM_CREATE],
        (K::Team, A::Read) => &[perm::TEAM_READ],
        (K::Team, A::Update) => &[perm::TEAM_UPDATE],
        (K::Team, A::Delete) => &[perm::TEAM_DELETE],
        (K::TeamMember, A::AddMember | A::RemoveMember) => &[perm::TEAM_MANAGE_MEMBERS],

        (K::AuditLog, A::ViewAudit) => &[perm::AUDIT_VIEW],
        (K::AuditLog, A::PurgeAudit) => &[perm::AUDIT_PURGE],

        _ => return None,
    };
    Some(list)
}

/// Classify the principal's relationship to the resource for this action.
pub fn evaluate_scope(principal: &Principal, action: Action, resource: &Resource) -> Scope {
    match resource {
        Resource::Department { id } => department_scope(principal, action, *id),
        Resource::Project(project) => project_scope(principal, action, project),
        Resource::ProjectMember {
            project,
            member_department_id,
        } => match principal.role {
            Role::Manager => Scope::from_bool(
                principal.in_department(project.department_id)
                    && principal.in_department(*member_department_id),
            ),
            _ => Scope::InScope,
        },
        Resource::Task(task) => task_scope(principal, action, task),
        Resource::Attachment { task, uploaded_by } => {
            if action == Action::DeleteAttachment && *uploaded_by == principal.id {
                Scope::Owner
            } else if action == Action::DeleteAttachment {
                match principal.role {
                    Role::Manager => Scope::from_bool(principal.in_department(task.project.department_id)),
                    _ => Scope::OutOfScope,
                }
            } else {
                task_scope(principal, Action::Read, task)
            }
        }
        Resource::Document(project) => document_scope(principal, action, project),
        Resource::TimeLog { owner_id, task } => time_log_scope(principal, action, *owner_id, task),
        Resource::Team(team) => team_scope(principal, action, team),
        Resource::TeamMember {
            team,
            member_department_id,
        } => match principal.role {
            Role::Manager => Scope::from_bool(
                principal.in_department(team.department_id)
                    && principal.in_department(*member_department_id),
            ),
            _ => Scope::OutOfScope,
        },
        Resource::AuditLog => Scope::InScope,
    }
}

fn department_scope(principal: &Principal, action: Action, id: Option<DbId>) -> Scope {
    let own = principal.in_department(id);
    match principal.role {
        Role::Manager => match action {
            Action::Update if own => Scope::Owner,
            Action::Read => Scope::from_bool(id.is_none() || own),
            Action::Create => Scope::InScope,
            _ => Scope::OutOfScope,
        },
        _ => match action {
            Action::Read if own => Scope::Owner,
            Action::Read => Scope::OutOfScope,
            _ => Scope::InScope,
        },
    }
}

fn project_scope(principal: &Principal, action: Action, project: &ProjectScope) -> Scope {
    match principal.role {
        Role::Manager => Scope::from_bool(
            principal.in_department(project.department_id)
                || (action == Action::Read && project.involves(principal.id)),
        ),
        _ => match action {
            Action::Read => Scope::from_bool(project.involves(principal.id)),
            _ => Scope::OutOfScope,
        },
    }
}

/// Managers work on documents of their department's projects; deleting
/// one is left to ADMIN. Everyone else may only read, and only where they
/// take part in the project.
fn document_scope(principal: &Principal, action: Action, project: &ProjectScope) -> Scope {
    match (principal.role, action) {
        (Role::Manager, Action::Delete) => Scope::OutOfScope,
        (Role::Manager, _) => Scope::from_bool(
            principal.in_department(project.department_id)
                || (action == Action::Read && project.involves(principal.id)),
        ),
        (_, Action::Read) => Scope::from_bool(project.involves(principal.id)),
        _ => Scope::OutOfScope,
    }
}

fn task_scope(principal: &Principal, action: Action, task: &TaskScope) -> Scope {
    let is_creator = task.creator_id == principal.id;
    let is_assignee = task.assignee_id == Some(principal.id);

    if is_creator && action != Action::Create {
        return Scope::Owner;
    }

    match principal.role {
        Role::Manager => Scope::from_bool(
            principal.in_department(task.project.department_id)
                || (action == Action::Read && is_assignee),
        ),
        _ => match action {
            Action::Read
            | Action::UpdateStatus
            | Action::ManageHierarchy
            | Action::UploadAttachment
            | Action::Comment => Scope::from_bool(is_assignee),
            _ => Scope::OutOfScope,
        },
    }
}

fn time_log_scope(principal: &Principal, action: Action, owner_id: DbId, task: &TaskScope) -> Scope {
    let is_owner = owner_id == principal.id;
    match action {
        Action::StartTimer => {
            if is_owner && task_scope(principal, Action::Read, task) != Scope::OutOfScope {
                Scope::InScope
            } else {
                Scope::OutOfScope
            }
        }
        Action::StopTimer => {
            if is_owner {
                Scope::Owner
            } else {
                Scope::OutOfScope
            }
        }
        Action::Read if is_owner => Scope::Owner,
        Action::Read => match principal.role {
            Role::Manager => Scope::from_bool(principal.in_department(task.project.department_id)),
            _ => Scope::OutOfScope,
        },
        _ => Scope::OutOfScope,
    }
}

fn team_scope(principal: &Principal, action: Action, team: &TeamScope) -> Scope {
    let involved = team.leader_id == Some(principal.id) || team.member_ids.contains(&principal.id);
    match principal.role {
        Role::Manager => Scope::from_bool(
            principal.in_department(team.department_id) || (action == Action::Read && involved),
        ),
        _ => match action {
            Action::Read if involved => Scope::Owner,
            _ => Scope::OutOfScope,
        },
    }
}
