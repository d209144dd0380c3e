//! Project document entity and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use taskforge_core::document::DocumentCategory;
use taskforge_core::types::{DbId, Timestamp};

use crate::models::project::ProjectVisibility;

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: DbId,
    pub task_id: Option<DbId>,
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub mimetype: String,
    pub uploaded_by: DbId,
    pub category: String,
    pub tags: Vec<String>,
    pub version: i32,
    pub previous_version_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub project_id: DbId,
    pub task_id: Option<DbId>,
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub mimetype: String,
    pub uploaded_by: DbId,
    pub category: DocumentCategory,
    pub tags: Vec<String>,
}

/// Stored file behind a new version.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub mimetype: String,
}

/// Changes carried into the next version. `None` keeps the predecessor's value.
#[derive(Debug, Clone, Default)]
pub struct NewDocumentVersion {
    pub uploaded_by: DbId,
    pub file: Option<DocumentFile>,
    pub category: Option<DocumentCategory>,
    pub tags: Option<Vec<String>>,
}

/// Listing filter. A document is visible wherever its project is.
#[derive(Debug, Clone)]
pub struct DocumentListFilter {
    pub visibility: ProjectVisibility,
    pub project_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub category: Option<DocumentCategory>,
    pub limit: i64,
    pub offset: i64,
}
