//! Seed helpers shared by the repository integration tests.

#![allow(dead_code)]

use sqlx::PgPool;
use taskforge_core::roles::Role;
use taskforge_core::types::DbId;
use taskforge_db::models::department::CreateDepartment;
use taskforge_db::models::project::{CreateProject, Project};
use taskforge_db::models::task::{CreateTask, Task};
use taskforge_db::models::user::{CreateUser, User};
use taskforge_db::repositories::{DepartmentRepo, ProjectRepo, TaskRepo, UserRepo};

pub async fn seed_department(pool: &PgPool, name: &str) -> DbId {
    DepartmentRepo::create(
        pool,
        &CreateDepartment {
            name: name.to_string(),
            description: None,
            manager_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn seed_user(pool: &PgPool, email: &str, role: Role, department_id: Option<DbId>) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            full_name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            department_id,
        },
    )
    .await
    .unwrap()
}

pub fn new_project(name: &str, manager_id: DbId, department_id: Option<DbId>) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        code: None,
        description: None,
        manager_id,
        department_id,
        priority: None,
        start_date: None,
        end_date: None,
        estimated_hours: None,
    }
}

pub async fn seed_project(pool: &PgPool, manager_id: DbId, department_id: Option<DbId>) -> Project {
    ProjectRepo::create(pool, &new_project("Platform", manager_id, department_id))
        .await
        .unwrap()
}

pub fn new_task(project_id: DbId, title: &str, assigned_to: Option<DbId>) -> CreateTask {
    CreateTask {
        project_id,
        title: title.to_string(),
        description: None,
        assigned_to,
        priority: None,
        due_date: None,
        estimated_hours: None,
        tags: Vec::new(),
    }
}

pub async fn seed_task(pool: &PgPool, project_id: DbId, created_by: DbId, title: &str) -> Task {
    TaskRepo::create(pool, created_by, &new_task(project_id, title, None))
        .await
        .unwrap()
}

/// A manager with a department, a project they run, and nothing else.
pub struct Fixture {
    pub department_id: DbId,
    pub manager: User,
    pub project: Project,
}

pub async fn fixture(pool: &PgPool) -> Fixture {
    let department_id = seed_department(pool, "Engineering").await;
    let manager = seed_user(pool, "mgr@example.com", Role::Manager, Some(department_id)).await;
    let project = seed_project(pool, manager.id, Some(department_id)).await;
    Fixture {
        department_id,
        manager,
        project,
    }
}
