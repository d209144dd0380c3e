//! Integration tests for the task hierarchy, dependency list and
//! conditional status writes.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use sqlx::PgPool;
use taskforge_core::error::{ConflictKind, CoreError};
use taskforge_core::status::TaskStatus;
use taskforge_db::models::task::{StatusWrite, TaskListFilter, TaskVisibility};
use taskforge_db::repositories::TaskRepo;
use taskforge_db::RepoError;

use common::{fixture, seed_task};

fn conflict_kind(err: RepoError) -> ConflictKind {
    match err {
        RepoError::Core(CoreError::Conflict { kind, .. }) => kind,
        other => panic!("expected a conflict, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_parent_links_and_lists_subtasks(pool: PgPool) {
    let f = fixture(&pool).await;
    let parent = seed_task(&pool, f.project.id, f.manager.id, "Epic").await;
    let child = seed_task(&pool, f.project.id, f.manager.id, "Story").await;

    let linked = TaskRepo::set_parent(&pool, child.id, parent.id).await.unwrap();
    assert_eq!(linked.parent_task_id, Some(parent.id));

    let subtasks = TaskRepo::subtasks(&pool, parent.id).await.unwrap();
    assert_eq!(subtasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![child.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_parent_rejects_descendant(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;
    let b = seed_task(&pool, f.project.id, f.manager.id, "B").await;
    let c = seed_task(&pool, f.project.id, f.manager.id, "C").await;

    TaskRepo::set_parent(&pool, b.id, a.id).await.unwrap();
    TaskRepo::set_parent(&pool, c.id, b.id).await.unwrap();

    let err = TaskRepo::set_parent(&pool, a.id, c.id).await.unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::CyclicParent);

    let a_after = TaskRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(a_after.parent_task_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_parent_to_self_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;

    let err = TaskRepo::set_parent(&pool, a.id, a.id).await.unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::CyclicParent);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_parent_missing_task_is_not_found(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;

    let err = TaskRepo::set_parent(&pool, a.id, 999_999).await.unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::NotFound { id: 999_999, .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remove_parent_is_idempotent(pool: PgPool) {
    let f = fixture(&pool).await;
    let parent = seed_task(&pool, f.project.id, f.manager.id, "Epic").await;
    let child = seed_task(&pool, f.project.id, f.manager.id, "Story").await;
    TaskRepo::set_parent(&pool, child.id, parent.id).await.unwrap();

    for _ in 0..2 {
        let task = TaskRepo::remove_parent(&pool, child.id).await.unwrap().unwrap();
        assert_eq!(task.parent_task_id, None);
    }
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_dependency_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;
    let b = seed_task(&pool, f.project.id, f.manager.id, "B").await;

    let task = TaskRepo::add_dependency(&pool, a.id, b.id, false).await.unwrap();
    assert_eq!(task.dependencies, vec![b.id]);

    let err = TaskRepo::add_dependency(&pool, a.id, b.id, false).await.unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::DuplicateDependency);

    let stored = TaskRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(stored.dependencies, vec![b.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_duplicate_adds_store_one_entry(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;
    let b = seed_task(&pool, f.project.id, f.manager.id, "B").await;

    let (first, second) = tokio::join!(
        TaskRepo::add_dependency(&pool, a.id, b.id, false),
        TaskRepo::add_dependency(&pool, a.id, b.id, false),
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let stored = TaskRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(stored.dependencies, vec![b.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_self_dependency_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;

    let err = TaskRepo::add_dependency(&pool, a.id, a.id, false).await.unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::SelfReference);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transitive_cycle_only_rejected_when_enabled(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;
    let b = seed_task(&pool, f.project.id, f.manager.id, "B").await;
    let c = seed_task(&pool, f.project.id, f.manager.id, "C").await;

    TaskRepo::add_dependency(&pool, a.id, b.id, true).await.unwrap();
    TaskRepo::add_dependency(&pool, b.id, c.id, true).await.unwrap();

    let err = TaskRepo::add_dependency(&pool, c.id, a.id, true).await.unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::CyclicDependency);

    TaskRepo::add_dependency(&pool, c.id, a.id, false).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_remove_dependency_is_idempotent(pool: PgPool) {
    let f = fixture(&pool).await;
    let a = seed_task(&pool, f.project.id, f.manager.id, "A").await;
    let b = seed_task(&pool, f.project.id, f.manager.id, "B").await;
    TaskRepo::add_dependency(&pool, a.id, b.id, false).await.unwrap();

    for _ in 0..2 {
        let task = TaskRepo::remove_dependency(&pool, a.id, b.id).await.unwrap().unwrap();
        assert!(task.dependencies.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_write_requires_expected_status(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = seed_task(&pool, f.project.id, f.manager.id, "Ship").await;
    let now = Utc::now();

    let done = TaskRepo::update_status(
        &pool,
        task.id,
        StatusWrite {
            expected: TaskStatus::Todo,
            next: TaskStatus::Done,
            completed_at: Some(now),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(done.status_id, TaskStatus::Done.id());
    assert!(done.completed_at.is_some());

    let stale = TaskRepo::update_status(
        &pool,
        task.id,
        StatusWrite {
            expected: TaskStatus::Todo,
            next: TaskStatus::InProgress,
            completed_at: None,
        },
    )
    .await
    .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_done_without_completed_at_violates_check(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = seed_task(&pool, f.project.id, f.manager.id, "Ship").await;

    let result = TaskRepo::update_status(
        &pool,
        task.id,
        StatusWrite {
            expected: TaskStatus::Todo,
            next: TaskStatus::Done,
            completed_at: None,
        },
    )
    .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_tasks_are_hidden(pool: PgPool) {
    let f = fixture(&pool).await;
    let task = seed_task(&pool, f.project.id, f.manager.id, "Old").await;

    assert!(TaskRepo::soft_delete(&pool, task.id).await.unwrap());
    assert!(!TaskRepo::soft_delete(&pool, task.id).await.unwrap());
    assert!(TaskRepo::find_by_id(&pool, task.id).await.unwrap().is_none());

    let filter = TaskListFilter {
        visibility: TaskVisibility::All,
        status: None,
        priority: None,
        project_id: Some(f.project.id),
        assigned_to: None,
        search: None,
        limit: 20,
        offset: 0,
    };
    assert!(TaskRepo::list(&pool, &filter).await.unwrap().is_empty());
    assert_eq!(TaskRepo::count(&pool, &filter).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_department_visibility_filters_by_project(pool: PgPool) {
    let f = fixture(&pool).await;
    seed_task(&pool, f.project.id, f.manager.id, "Inside").await;

    let other_dept = common::seed_department(&pool, "Sales").await;
    let filter = |department_id| TaskListFilter {
        visibility: TaskVisibility::Department(department_id),
        status: None,
        priority: None,
        project_id: None,
        assigned_to: None,
        search: Some("insi".to_string()),
        limit: 20,
        offset: 0,
    };

    assert_eq!(TaskRepo::count(&pool, &filter(f.department_id)).await.unwrap(), 1);
    assert_eq!(TaskRepo::count(&pool, &filter(other_dept)).await.unwrap(), 0);
}
