use taskforge_core::error::CoreError;

/// Error from a repository method that enforces a domain invariant inside
/// its transaction.
///
/// Plain CRUD methods return `sqlx::Error` directly; methods such as
/// `TaskRepo::set_parent` or `TimeLogRepo::stop` can also reject with a
/// domain outcome decided under the row or advisory lock.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Name of the unique constraint behind a `23505` error, if that is what
/// `err` is.
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
