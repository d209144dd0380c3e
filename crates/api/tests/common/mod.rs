//! Shared helpers for the HTTP integration tests: app construction, seed
//! data, bearer tokens and request shortcuts.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use taskforge_api::auth::jwt::{generate_access_token, JwtConfig};
use taskforge_api::config::{ServerConfig, DEFAULT_MAX_ATTACHMENT_BYTES};
use taskforge_api::router::build_app_router;
use taskforge_api::state::AppState;
use taskforge_api::storage::LocalFileStore;
use taskforge_core::roles::Role;
use taskforge_core::types::DbId;
use taskforge_db::models::department::CreateDepartment;
use taskforge_db::models::project::{CreateProject, Project};
use taskforge_db::models::user::{CreateUser, User};
use taskforge_db::repositories::{DepartmentRepo, ProjectRepo, UserRepo};
use taskforge_events::EventBus;

pub const BOUNDARY: &str = "taskforge-test-boundary";

/// Build a test `ServerConfig` with safe defaults and the given attachment
/// root.
pub fn test_config(attachment_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        attachment_dir: attachment_dir.to_path_buf(),
        max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        reject_dependency_cycles: false,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// The application under test. Keeps the attachment directory alive for
/// as long as the router is used.
pub struct TestApp {
    pub router: Router,
    pub config: ServerConfig,
    pub events: Arc<EventBus>,
    pub files: TempDir,
}

pub fn build_test_app(pool: PgPool) -> TestApp {
    let files = tempfile::tempdir().unwrap();
    let config = test_config(files.path());

    let events = Arc::new(EventBus::default());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&events),
        file_store: Arc::new(LocalFileStore::new(files.path())),
    };
    let router = build_app_router(state, &config);
    TestApp {
        router,
        config,
        events,
        files,
    }
}

impl TestApp {
    pub fn token(&self, user: &User) -> String {
        generate_access_token(user.id, "", &self.config.jwt).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Multipart upload with a single `file` field.
    pub async fn upload(&self, uri: &str, token: &str, filename: &str, bytes: &[u8]) -> Response {
        self.multipart(Method::POST, uri, token, &[], Some((filename, bytes)))
            .await
    }

    /// Multipart form with text `fields` and an optional `file` part.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                     Content-Type: text/plain\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Number of audit entries with `action` recorded against `entity_id`.
pub async fn audit_count(pool: &PgPool, action: &str, entity_id: DbId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM audit_logs WHERE action = $1 AND entity_id = $2")
        .bind(action)
        .bind(entity_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

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

pub async fn seed_project(pool: &PgPool, manager_id: DbId, department_id: Option<DbId>) -> Project {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: "Platform".to_string(),
            code: None,
            description: None,
            manager_id,
            department_id,
            priority: None,
            start_date: None,
            end_date: None,
            estimated_hours: None,
        },
    )
    .await
    .unwrap()
}

/// An admin, a department with a manager and a plain user, and a project
/// the manager runs.
pub struct Org {
    pub department_id: DbId,
    pub admin: User,
    pub manager: User,
    pub user: User,
    pub project: Project,
}

pub async fn seed_org(pool: &PgPool) -> Org {
    let department_id = seed_department(pool, "Engineering").await;
    let admin = seed_user(pool, "admin@example.com", Role::Admin, None).await;
    let manager = seed_user(pool, "mgr@example.com", Role::Manager, Some(department_id)).await;
    let user = seed_user(pool, "dev@example.com", Role::User, Some(department_id)).await;
    let project = seed_project(pool, manager.id, Some(department_id)).await;
    Org {
        department_id,
        admin,
        manager,
        user,
        project,
    }
}

/// Create a task through the API as `token`, returning its JSON.
pub async fn create_task(
    app: &TestApp,
    token: &str,
    project_id: DbId,
    title: &str,
    assigned_to: Option<DbId>,
) -> serde_json::Value {
    let response = app
        .post_json(
            "/api/v1/tasks",
            token,
            serde_json::json!({
                "project_id": project_id,
                "title": title,
                "assigned_to": assigned_to,
            }),
        )
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
