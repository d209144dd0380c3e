use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use taskforge_core::error::{ConflictKind, CoreError};
use taskforge_db::RepoError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(core) => Self::Core(core),
            RepoError::Database(db) => Self::Database(db),
        }
    }
}

impl AppError {
    pub fn not_found(entity: &'static str, id: taskforge_core::types::DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}

/// Status, stable code, client-facing message, and the conflict sub-kind
/// when there is one.
type Classified = (StatusCode, &'static str, String, Option<ConflictKind>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, conflict) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(kind) = conflict {
            body["conflict"] = json!(kind.code());
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        None,
    )
}

fn classify_core_error(core: &CoreError) -> Classified {
    let code = core.kind();
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            code,
            format!("{entity} with id {id} not found"),
            None,
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, code, msg.clone(), None),
        CoreError::Conflict { kind, message } => (StatusCode::CONFLICT, code, message.clone(), Some(*kind)),
        CoreError::Denied(reason) => (StatusCode::FORBIDDEN, code, format!("Access denied: {reason}"), None),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, code, msg.clone(), None),
        CoreError::InvalidTransition(msg) => (StatusCode::UNPROCESSABLE_ENTITY, code, msg.clone(), None),
        CoreError::AuditWriteFailed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            "The change was applied but could not be recorded in the audit trail".to_string(),
            None,
        ),
        CoreError::StoreUnavailable(msg) => {
            tracing::warn!(error = %msg, "Store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                code,
                "The data store is temporarily unavailable".to_string(),
                None,
            )
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP response triple.
///
/// - `RowNotFound` maps to 404.
/// - Pool exhaustion, a closed pool and I/O failures map to 503.
/// - Unique violations on a `uq_*` constraint map to 409 `DUPLICATE_VALUE`.
/// - Foreign-key and check violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            classify_core_error(&CoreError::StoreUnavailable(err.to_string()))
        }
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                    Some(ConflictKind::DuplicateValue),
                ),
                Some("23503") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Referenced entity does not exist: {constraint}"),
                    None,
                ),
                Some("23514") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                    None,
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    internal()
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
