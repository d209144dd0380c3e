//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod attachment_repo;
pub mod audit_repo;
pub mod comment_repo;
pub mod department_repo;
pub mod document_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod task_repo;
pub mod team_repo;
pub mod time_log_repo;
pub mod user_repo;

pub use attachment_repo::AttachmentRepo;
pub use audit_repo::AuditLogRepo;
pub use comment_repo::CommentRepo;
pub use department_repo::DepartmentRepo;
pub use document_repo::DocumentRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use team_repo::TeamRepo;
pub use time_log_repo::TimeLogRepo;
pub use user_repo::UserRepo;
