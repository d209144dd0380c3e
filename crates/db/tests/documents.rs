//! Integration tests for document versioning and visibility.

mod common;

use sqlx::PgPool;
use taskforge_core::document::DocumentCategory;
use taskforge_core::roles::Role;
use taskforge_core::types::DbId;
use taskforge_db::models::document::{
    CreateDocument, DocumentFile, DocumentListFilter, NewDocumentVersion,
};
use taskforge_db::models::project::ProjectVisibility;
use taskforge_db::repositories::DocumentRepo;

use common::{fixture, seed_department, seed_project, seed_user};

fn new_document(project_id: DbId, uploaded_by: DbId) -> CreateDocument {
    CreateDocument {
        project_id,
        task_id: None,
        filename: "plan.pdf".to_string(),
        path: format!("documents/{project_id}/a-plan.pdf"),
        size_bytes: 1024,
        mimetype: "application/pdf".to_string(),
        uploaded_by,
        category: DocumentCategory::default(),
        tags: vec!["plan".to_string()],
    }
}

fn filter(visibility: ProjectVisibility) -> DocumentListFilter {
    DocumentListFilter {
        visibility,
        project_id: None,
        task_id: None,
        category: None,
        limit: 20,
        offset: 0,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_version_supersedes_previous(pool: PgPool) {
    let f = fixture(&pool).await;
    let first = DocumentRepo::create(&pool, &new_document(f.project.id, f.manager.id))
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.category, "DOCUMENT");

    let input = NewDocumentVersion {
        uploaded_by: f.manager.id,
        tags: Some(vec!["final".to_string()]),
        ..Default::default()
    };
    let second = DocumentRepo::new_version(&pool, first.id, &input)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(second.previous_version_id, Some(first.id));
    assert_eq!(second.path, first.path);
    assert_eq!(second.tags, vec!["final"]);

    assert!(DocumentRepo::find_by_id(&pool, first.id).await.unwrap().is_none());

    // The superseded head cannot be versioned again.
    let stale = DocumentRepo::new_version(&pool, first.id, &input).await.unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_version_replaces_file(pool: PgPool) {
    let f = fixture(&pool).await;
    let first = DocumentRepo::create(&pool, &new_document(f.project.id, f.manager.id))
        .await
        .unwrap();

    let input = NewDocumentVersion {
        uploaded_by: f.manager.id,
        file: Some(DocumentFile {
            filename: "plan-v2.pdf".to_string(),
            path: "documents/1/b-plan-v2.pdf".to_string(),
            size_bytes: 2048,
            mimetype: "application/pdf".to_string(),
        }),
        category: Some(DocumentCategory::Other),
        tags: None,
    };
    let second = DocumentRepo::new_version(&pool, first.id, &input)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.filename, "plan-v2.pdf");
    assert_eq!(second.size_bytes, 2048);
    assert_eq!(second.category, "OTHER");
    assert_eq!(second.tags, first.tags);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_listing_follows_project_visibility(pool: PgPool) {
    let f = fixture(&pool).await;
    let other_dept = seed_department(&pool, "Sales").await;
    let other_mgr = seed_user(&pool, "sales@example.com", Role::Manager, Some(other_dept)).await;
    let other_project = seed_project(&pool, other_mgr.id, Some(other_dept)).await;
    let outsider = seed_user(&pool, "dev@example.com", Role::User, Some(f.department_id)).await;

    DocumentRepo::create(&pool, &new_document(f.project.id, f.manager.id))
        .await
        .unwrap();
    DocumentRepo::create(&pool, &new_document(other_project.id, other_mgr.id))
        .await
        .unwrap();

    assert_eq!(DocumentRepo::count(&pool, &filter(ProjectVisibility::All)).await.unwrap(), 2);

    let dept_view = filter(ProjectVisibility::DepartmentOrInvolving {
        department_id: f.department_id,
        user_id: f.manager.id,
    });
    let docs = DocumentRepo::list(&pool, &dept_view).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].project_id, f.project.id);

    let none = filter(ProjectVisibility::Involving(outsider.id));
    assert_eq!(DocumentRepo::count(&pool, &none).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_document_is_hidden(pool: PgPool) {
    let f = fixture(&pool).await;
    let doc = DocumentRepo::create(&pool, &new_document(f.project.id, f.manager.id))
        .await
        .unwrap();

    assert!(DocumentRepo::soft_delete(&pool, doc.id).await.unwrap());
    assert!(!DocumentRepo::soft_delete(&pool, doc.id).await.unwrap());
    assert!(DocumentRepo::find_by_id(&pool, doc.id).await.unwrap().is_none());
    assert_eq!(DocumentRepo::count(&pool, &filter(ProjectVisibility::All)).await.unwrap(), 0);
}
