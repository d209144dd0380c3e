//! Loads the resource snapshots the authorization engine decides on.
//!
//! Every loader checks existence first and reports a missing or
//! soft-deleted row as `NotFound` before any decision is made.

use taskforge_core::authz::{self, Action, ProjectScope, Resource, TaskScope, TeamScope};
use taskforge_core::types::DbId;
use taskforge_db::models::document::Document;
use taskforge_db::models::project::Project;
use taskforge_db::models::task::Task;
use taskforge_db::models::team::Team;
use taskforge_db::repositories::{DocumentRepo, ProjectRepo, TaskRepo, TeamRepo, UserRepo};
use taskforge_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Run the authorization engine and turn a denial into a 403.
pub fn authorize(user: &AuthUser, action: Action, resource: &Resource) -> AppResult<()> {
    let decision = authz::authorize(&user.principal, action, resource);
    if !decision.is_allowed() {
        tracing::debug!(
            user_id = user.id(),
            action = action.as_str(),
            entity_type = resource.kind().as_str(),
            ?decision,
            "Authorization denied"
        );
    }
    Ok(decision.into_result()?)
}

pub async fn load_project(pool: &DbPool, id: DbId) -> AppResult<(Project, ProjectScope)> {
    let project = ProjectRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::not_found("Project", id))?;
    let scope = project_scope(pool, &project).await?;
    Ok((project, scope))
}

pub async fn project_scope(pool: &DbPool, project: &Project) -> AppResult<ProjectScope> {
    Ok(ProjectScope {
        department_id: project.department_id,
        manager_id: project.manager_id,
        member_ids: ProjectRepo::member_ids(pool, project.id).await?,
    })
}

pub async fn load_task(pool: &DbPool, id: DbId) -> AppResult<(Task, TaskScope)> {
    let task = TaskRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::not_found("Task", id))?;
    let scope = task_scope(pool, &task).await?;
    Ok((task, scope))
}

pub async fn task_scope(pool: &DbPool, task: &Task) -> AppResult<TaskScope> {
    let (_, project) = load_project(pool, task.project_id).await?;
    Ok(TaskScope {
        project,
        assignee_id: task.assigned_to,
        creator_id: task.created_by,
    })
}

/// An active document and the scope of the project it belongs to.
pub async fn load_document(pool: &DbPool, id: DbId) -> AppResult<(Document, ProjectScope)> {
    let document = DocumentRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::not_found("Document", id))?;
    let (_, scope) = load_project(pool, document.project_id).await?;
    Ok((document, scope))
}

pub async fn load_team(pool: &DbPool, id: DbId) -> AppResult<(Team, TeamScope)> {
    let team = TeamRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::not_found("Team", id))?;
    let scope = TeamScope {
        department_id: team.department_id,
        leader_id: team.leader_id,
        member_ids: TeamRepo::member_ids(pool, team.id).await?,
    };
    Ok((team, scope))
}

/// Department of an active user, or `NotFound`.
pub async fn user_department(pool: &DbPool, user_id: DbId) -> AppResult<Option<DbId>> {
    UserRepo::department_of(pool, user_id)
        .await?
        .ok_or(AppError::not_found("User", user_id))
}
