//! HTTP integration tests for timers: one running timer per user, owner-only
//! stop and hour accounting.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_task, seed_org};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_start_is_already_running(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Build", Some(org.user.id)).await;
    let token = app.token(&org.user);
    let body = serde_json::json!({"task_id": task["id"]});

    let response = app.post_json("/api/v1/time/start", &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let log = body_json(response).await["data"].clone();
    assert_eq!(log["status"], "RUNNING");
    assert_eq!(log["is_billable"], true);

    let response = app.post_json("/api/v1/time/start", &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "ALREADY_RUNNING");

    let response = app.get("/api/v1/time/running", &token).await;
    assert_eq!(body_json(response).await["data"]["id"], log["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_cannot_time_an_unassigned_task(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Build", None).await;

    let response = app
        .post_json(
            "/api/v1/time/start",
            &app.token(&org.user),
            serde_json::json!({"task_id": task["id"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_only_owner_may_stop_even_admin(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Build", Some(org.user.id)).await;
    let token = app.token(&org.user);

    let response = app
        .post_json("/api/v1/time/start", &token, serde_json::json!({"task_id": task["id"]}))
        .await;
    let log = body_json(response).await["data"].clone();
    let stop_uri = format!("/api/v1/time/{}/stop", log["id"]);

    let response = app.post_json(&stop_uri, &app.token(&org.admin), serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "DENIED");

    let response = app.post_json(&stop_uri, &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stopped = body_json(response).await["data"].clone();
    assert_eq!(stopped["status"], "STOPPED");
    assert!(stopped["end_time"].is_string());

    let response = app.post_json(&stop_uri, &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "ALREADY_STOPPED");

    let response = app.get("/api/v1/time/running", &token).await;
    assert!(body_json(response).await["data"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_returns_own_logs_newest_first(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let task = create_task(&app, &app.token(&org.manager), org.project.id, "Build", Some(org.user.id)).await;
    let token = app.token(&org.user);
    let body = serde_json::json!({"task_id": task["id"]});

    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = app.post_json("/api/v1/time/start", &token, body.clone()).await;
        let log = body_json(response).await["data"].clone();
        app.post_json(&format!("/api/v1/time/{}/stop", log["id"]), &token, serde_json::json!({}))
            .await;
        ids.push(log["id"].clone());
    }

    let response = app.get("/api/v1/time?page=1&limit=10", &token).await;
    let page = body_json(response).await["data"].clone();
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["id"], ids[1]);

    let response = app.get("/api/v1/time", &app.token(&org.manager)).await;
    assert_eq!(body_json(response).await["data"]["total"], 0);
}
