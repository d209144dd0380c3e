//! HTTP integration tests for tasks: creation, status changes, hierarchy,
//! dependencies and attachments.

mod common;

use axum::http::StatusCode;
use common::{audit_count, body_json, build_test_app, create_task, seed_department, seed_org, seed_project, seed_user};
use sqlx::PgPool;
use taskforge_core::roles::Role;

// ---------------------------------------------------------------------------
// Creation and listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_task_records_one_audit_entry(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let token = app.token(&org.manager);

    let task = create_task(&app, &token, org.project.id, "Write migrations", None).await;
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["created_by"], org.manager.id);

    let id = task["id"].as_i64().unwrap();
    assert_eq!(audit_count(&pool, "CREATE_TASK", id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_task_publishes_assignment(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let mut events = app.events.subscribe();

    create_task(&app, &app.token(&org.manager), org.project.id, "Triage", Some(org.user.id)).await;
    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, "task.assigned");
    assert_eq!(event.actor_id, Some(org.manager.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_and_delete_task_record_one_audit_entry_each(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let token = app.token(&org.manager);
    let task = create_task(&app, &token, org.project.id, "Draft", None).await;
    let id = task["id"].as_i64().unwrap();
    let uri = format!("/api/v1/tasks/{id}");

    let response = app
        .put_json(&uri, &token, serde_json::json!({"title": "Final", "status": "IN_PROGRESS"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["title"], "Final");
    assert_eq!(audit_count(&pool, "UPDATE_TASK", id).await, 1);

    let response = app
        .patch_json(&format!("{uri}/status"), &token, serde_json::json!({"status": "REVIEW"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(audit_count(&pool, "UPDATE_TASK_STATUS", id).await, 1);

    let response = app.delete(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(audit_count(&pool, "DELETE_TASK", id).await, 1);

    let response = app.get(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(audit_count(&pool, "UPDATE_TASK", id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_audit_failure_after_commit_is_reported(pool: PgPool) {
    let org = seed_org(&pool).await;
    sqlx::query(
        "CREATE FUNCTION reject_audit_insert() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'audit store offline'; END $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_audit_insert BEFORE INSERT ON audit_logs \
         FOR EACH ROW EXECUTE FUNCTION reject_audit_insert()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let app = build_test_app(pool.clone());
    let mut events = app.events.subscribe();

    let response = app
        .post_json(
            "/api/v1/tasks",
            &app.token(&org.manager),
            serde_json::json!({
                "project_id": org.project.id,
                "title": "Committed anyway",
                "assigned_to": org.user.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "AUDIT_WRITE_FAILED");

    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM tasks WHERE title = 'Committed anyway'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tasks, 1);

    // Nobody is notified about an operation reported as failed.
    assert!(events.try_recv().is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_task_with_blank_title_is_rejected(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);

    let response = app
        .post_json(
            "/api/v1/tasks",
            &token,
            serde_json::json!({"project_id": org.project.id, "title": "   "}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_lists_only_assigned_tasks(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let manager_token = app.token(&org.manager);

    create_task(&app, &manager_token, org.project.id, "Mine", Some(org.user.id)).await;
    create_task(&app, &manager_token, org.project.id, "Not mine", None).await;

    let response = app.get("/api/v1/tasks", &app.token(&org.user)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Mine");

    let response = app.get("/api/v1/tasks?page=1&limit=1", &manager_token).await;
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_cannot_change_status_of_unassigned_task(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Review", None).await;
    let id = task["id"].as_i64().unwrap();

    let response = app
        .patch_json(
            &format!("/api/v1/tasks/{id}/status"),
            &app.token(&org.user),
            serde_json::json!({"status": "IN_PROGRESS"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "DENIED");
    assert_eq!(audit_count(&pool, "UPDATE_TASK_STATUS", id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_done_stamps_completed_at_and_cannot_be_cancelled(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Ship", Some(org.user.id)).await;
    let id = task["id"].as_i64().unwrap();
    let uri = format!("/api/v1/tasks/{id}/status");
    let token = app.token(&org.user);

    let response = app.patch_json(&uri, &token, serde_json::json!({"status": "DONE"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let done = body_json(response).await["data"].clone();
    assert_eq!(done["status"], "DONE");
    assert!(done["completed_at"].is_string());

    let response = app.patch_json(&uri, &token, serde_json::json!({"status": "DONE"})).await;
    let again = body_json(response).await["data"].clone();
    assert_eq!(again["completed_at"], done["completed_at"]);

    let response = app.patch_json(&uri, &token, serde_json::json!({"status": "CANCELLED"})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reopening_clears_completed_at(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let task = create_task(&app, &token, org.project.id, "Ship", None).await;
    let uri = format!("/api/v1/tasks/{}/status", task["id"]);

    app.patch_json(&uri, &token, serde_json::json!({"status": "DONE"})).await;
    let response = app.patch_json(&uri, &token, serde_json::json!({"status": "IN_PROGRESS"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["completed_at"].is_null());
}

// ---------------------------------------------------------------------------
// Hierarchy and dependencies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_dependency_is_a_conflict(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let token = app.token(&org.manager);
    let a = create_task(&app, &token, org.project.id, "A", None).await;
    let b = create_task(&app, &token, org.project.id, "B", None).await;
    let uri = format!("/api/v1/tasks/{}/dependencies", a["id"]);
    let body = serde_json::json!({"dependency_id": b["id"]});

    let response = app.post_json(&uri, &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["dependencies"], serde_json::json!([b["id"]]));

    let response = app.post_json(&uri, &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["conflict"], "DUPLICATE_DEPENDENCY");

    let a_id = a["id"].as_i64().unwrap();
    assert_eq!(audit_count(&pool, "ADD_DEPENDENCY", a_id).await, 1);

    // Removal is audited once; repeating it is a silent no-op.
    let remove_uri = format!("{uri}/{}", b["id"]);
    for _ in 0..2 {
        let response = app.delete(&remove_uri, &token).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["dependencies"], serde_json::json!([]));
    }
    assert_eq!(audit_count(&pool, "REMOVE_DEPENDENCY", a_id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dependency_on_task_outside_department_is_denied(pool: PgPool) {
    let org = seed_org(&pool).await;
    let sales = seed_department(&pool, "Sales").await;
    let sales_manager = seed_user(&pool, "sales-mgr@example.com", Role::Manager, Some(sales)).await;
    let sales_project = seed_project(&pool, sales_manager.id, Some(sales)).await;
    let app = build_test_app(pool.clone());
    let token = app.token(&org.manager);

    let ours = create_task(&app, &token, org.project.id, "Ours", None).await;
    let theirs = create_task(&app, &app.token(&sales_manager), sales_project.id, "Theirs", None).await;
    let uri = format!("/api/v1/tasks/{}/dependencies", ours["id"]);

    let response = app
        .post_json(&uri, &token, serde_json::json!({"dependency_id": theirs["id"]}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(&uri, &token, serde_json::json!({"dependency_id": 999_999}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get(&format!("/api/v1/tasks/{}", ours["id"]), &token).await;
    assert_eq!(body_json(response).await["data"]["dependencies"], serde_json::json!([]));
    assert_eq!(audit_count(&pool, "ADD_DEPENDENCY", ours["id"].as_i64().unwrap()).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_self_dependency_is_rejected(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let a = create_task(&app, &token, org.project.id, "A", None).await;

    let response = app
        .post_json(
            &format!("/api/v1/tasks/{}/dependencies", a["id"]),
            &token,
            serde_json::json!({"dependency_id": a["id"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "SELF_REFERENCE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cyclic_parent_is_rejected(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let a = create_task(&app, &token, org.project.id, "A", None).await;
    let b = create_task(&app, &token, org.project.id, "B", None).await;

    let response = app
        .post_json(
            &format!("/api/v1/tasks/{}/subtasks", a["id"]),
            &token,
            serde_json::json!({"subtask_id": b["id"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["parent_task_id"], a["id"]);

    let response = app
        .post_json(
            &format!("/api/v1/tasks/{}/subtasks", b["id"]),
            &token,
            serde_json::json!({"subtask_id": a["id"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "CYCLIC_PARENT");

    let response = app.get(&format!("/api/v1/tasks/{}/subtasks", a["id"]), &token).await;
    let subtasks = body_json(response).await["data"].clone();
    assert_eq!(subtasks.as_array().unwrap().len(), 1);
    assert_eq!(subtasks[0]["id"], b["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_task_is_not_found_before_authorization(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app.get("/api/v1/tasks/999999", &app.token(&org.user)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_attachment_upload_and_delete(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let task = create_task(&app, &token, org.project.id, "Docs", None).await;
    let base = format!("/api/v1/tasks/{}/attachments", task["id"]);

    let response = app.upload(&base, &token, "notes.txt", b"hello attachments").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let attachment = body_json(response).await["data"].clone();
    assert_eq!(attachment["filename"], "notes.txt");
    assert_eq!(attachment["size_bytes"], 17);

    let stored = app.files.path().join(attachment["path"].as_str().unwrap());
    assert_eq!(std::fs::read(&stored).unwrap(), b"hello attachments");

    let response = app.get(&base, &token).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = app.delete(&format!("{base}/{}", attachment["id"]), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!stored.exists());

    let response = app.get(&base, &token).await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upload_without_file_field_is_bad_request(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let task = create_task(&app, &token, org.project.id, "Docs", None).await;

    let response = app
        .post_json(
            &format!("/api/v1/tasks/{}/attachments", task["id"]),
            &token,
            serde_json::json!({}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assignee_can_comment_on_task(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Ship", Some(org.user.id)).await;
    let uri = format!("/api/v1/tasks/{}/comments", task["id"]);

    let response = app
        .post_json(&uri, &app.token(&org.user), serde_json::json!({"content": "On it"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get(&uri, &app.token(&org.manager)).await;
    let comments = body_json(response).await["data"].clone();
    assert_eq!(comments[0]["content"], "On it");
}
