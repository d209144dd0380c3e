//! HTTP integration tests for projects, departments and teams.

mod common;

use axum::http::StatusCode;
use common::{audit_count, body_json, build_test_app, seed_department, seed_org, seed_project, seed_user};
use sqlx::PgPool;
use taskforge_core::roles::Role;

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_project_adds_manager_as_lead(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/projects",
            &app.token(&org.manager),
            serde_json::json!({
                "name": "Billing",
                "manager_id": org.manager.id,
                "department_id": org.department_id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let project = body_json(response).await["data"].clone();
    assert!(project["code"].as_str().unwrap().starts_with("PROJ-"));
    assert_eq!(project["members"][0]["user_id"], org.manager.id);
    assert_eq!(project["members"][0]["role"], "LEAD");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_cannot_create_project(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/projects",
            &app.token(&org.user),
            serde_json::json!({"name": "Side quest", "manager_id": org.user.id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_member_is_a_conflict(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let token = app.token(&org.manager);
    let uri = format!("/api/v1/projects/{}/members", org.project.id);
    let body = serde_json::json!({"user_id": org.user.id});

    let response = app.post_json(&uri, &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["role"], "MEMBER");

    let response = app.post_json(&uri, &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "DUPLICATE_MEMBER");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manager_cannot_add_member_from_another_department(pool: PgPool) {
    let org = seed_org(&pool).await;
    let sales = seed_department(&pool, "Sales").await;
    let outsider = seed_user(&pool, "sales@example.com", Role::User, Some(sales)).await;
    let app = build_test_app(pool);

    let response = app
        .post_json(
            &format!("/api/v1/projects/{}/members", org.project.id),
            &app.token(&org.manager),
            serde_json::json!({"user_id": outsider.id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // ADMIN is not bound by departments.
    let response = app
        .post_json(
            &format!("/api/v1/projects/{}/members", org.project.id),
            &app.token(&org.admin),
            serde_json::json!({"user_id": outsider.id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manager_cannot_update_project_outside_department(pool: PgPool) {
    let org = seed_org(&pool).await;
    let sales = seed_department(&pool, "Sales").await;
    // Managed by the Engineering manager but owned by Sales.
    let project = seed_project(&pool, org.manager.id, Some(sales)).await;
    let app = build_test_app(pool.clone());
    let uri = format!("/api/v1/projects/{}", project.id);

    let response = app.get(&uri, &app.token(&org.manager)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .put_json(&uri, &app.token(&org.manager), serde_json::json!({"name": "Renamed"}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "DENIED");
    assert_eq!(audit_count(&pool, "UPDATE_PROJECT", project.id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_mutations_record_one_audit_entry_each(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let admin = app.token(&org.admin);

    let response = app
        .post_json(
            "/api/v1/projects",
            &admin,
            serde_json::json!({
                "name": "Billing",
                "manager_id": org.manager.id,
                "department_id": org.department_id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    assert_eq!(audit_count(&pool, "CREATE_PROJECT", id).await, 1);

    let uri = format!("/api/v1/projects/{id}");
    let response = app
        .put_json(&uri, &app.token(&org.manager), serde_json::json!({"name": "Invoicing"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "Invoicing");
    assert_eq!(audit_count(&pool, "UPDATE_PROJECT", id).await, 1);

    let response = app.delete(&uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(audit_count(&pool, "DELETE_PROJECT", id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleted_project_is_not_found(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let uri = format!("/api/v1/projects/{}", org.project.id);

    let response = app.delete(&uri, &app.token(&org.admin)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&uri, &app.token(&org.admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Departments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manager_sees_only_own_department(pool: PgPool) {
    let org = seed_org(&pool).await;
    seed_department(&pool, "Sales").await;
    let app = build_test_app(pool);

    let response = app.get("/api/v1/departments", &app.token(&org.manager)).await;
    let departments = body_json(response).await["data"].clone();
    assert_eq!(departments.as_array().unwrap().len(), 1);
    assert_eq!(departments[0]["id"], org.department_id);

    let response = app.get("/api/v1/departments", &app.token(&org.admin)).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_department_name_is_a_conflict(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/departments",
            &app.token(&org.admin),
            serde_json::json!({"name": "Engineering"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflict"], "DUPLICATE_VALUE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_department_mutations_record_one_audit_entry_each(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let admin = app.token(&org.admin);

    let response = app
        .post_json("/api/v1/departments", &admin, serde_json::json!({"name": "Support"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    assert_eq!(audit_count(&pool, "CREATE_DEPARTMENT", id).await, 1);

    let uri = format!("/api/v1/departments/{id}");
    let response = app
        .put_json(&uri, &admin, serde_json::json!({"description": "Tier 1 and 2"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(audit_count(&pool, "UPDATE_DEPARTMENT", id).await, 1);

    let response = app.delete(&uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(audit_count(&pool, "DELETE_DEPARTMENT", id).await, 1);

    // A manager's own department update is audited under the same action.
    let own = format!("/api/v1/departments/{}", org.department_id);
    let response = app
        .put_json(&own, &app.token(&org.manager), serde_json::json!({"description": "Builders"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(audit_count(&pool, "UPDATE_DEPARTMENT", org.department_id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_department_detail_lists_members(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app
        .get(&format!("/api/v1/departments/{}", org.department_id), &app.token(&org.user))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let department = body_json(response).await["data"].clone();
    let members = department["member_ids"].as_array().unwrap();
    assert!(members.contains(&serde_json::json!(org.manager.id)));
    assert!(members.contains(&serde_json::json!(org.user.id)));
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_team_lifecycle(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);
    let admin = app.token(&org.admin);

    let response = app
        .post_json(
            "/api/v1/teams",
            &admin,
            serde_json::json!({
                "name": "Core",
                "department_id": org.department_id,
                "leader_id": org.manager.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let team = body_json(response).await["data"].clone();
    assert_eq!(team["member_ids"], serde_json::json!([org.manager.id]));
    let members_uri = format!("/api/v1/teams/{}/members", team["id"]);

    // The leader manages members within the department.
    let manager = app.token(&org.manager);
    let response = app
        .post_json(&members_uri, &manager, serde_json::json!({"user_id": org.user.id}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_json(&members_uri, &manager, serde_json::json!({"user_id": org.user.id}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A plain member sees the team in their listing.
    let response = app.get("/api/v1/teams", &app.token(&org.user)).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = app.delete(&format!("{members_uri}/{}", org.user.id), &manager).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.delete(&format!("{members_uri}/{}", org.user.id), &manager).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_team_mutations_record_one_audit_entry_each(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool.clone());
    let admin = app.token(&org.admin);

    let response = app
        .post_json(
            "/api/v1/teams",
            &admin,
            serde_json::json!({
                "name": "Platform",
                "department_id": org.department_id,
                "leader_id": org.manager.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    assert_eq!(audit_count(&pool, "CREATE_TEAM", id).await, 1);

    let uri = format!("/api/v1/teams/{id}");
    let response = app.put_json(&uri, &admin, serde_json::json!({"name": "Infra"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(audit_count(&pool, "UPDATE_TEAM", id).await, 1);

    let response = app.delete(&uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(audit_count(&pool, "DELETE_TEAM", id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manager_cannot_create_team(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/teams",
            &app.token(&org.manager),
            serde_json::json!({"name": "Core", "department_id": org.department_id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
