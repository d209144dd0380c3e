//! Upload byte storage.
//!
//! Attachment and document rows record a storage key; the bytes themselves
//! live behind a [`FileStore`]. [`LocalFileStore`] keeps them on local disk
//! under a configured root directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

/// Storage backend for uploaded bytes.
pub trait FileStore: Send + Sync {
    /// Persist `data` under `namespace` and return the storage key to record.
    fn put(
        &self,
        namespace: &str,
        filename: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = io::Result<String>> + Send;

    /// Remove the bytes behind `key`. A key with nothing behind it counts
    /// as already deleted.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = io::Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key under the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key '{key}'"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    async fn put(&self, namespace: &str, filename: &str, data: &[u8]) -> io::Result<String> {
        let key = format!("{namespace}/{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.resolve(&key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(key)
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(key, "Stored file already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Keep the client filename readable on disk while stripping anything that
/// is not a plain file-name character.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report final.pdf"), "report_final.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\a.txt"), "a.txt");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[tokio::test]
    async fn test_put_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let key = store.put("7", "notes.txt", b"hello").await.unwrap();
        assert!(key.starts_with("7/"));
        assert!(key.ends_with("-notes.txt"));
        let on_disk = tokio::fs::read(dir.path().join(&key)).await.unwrap();
        assert_eq!(on_disk, b"hello");

        store.delete(&key).await.unwrap();
        assert!(!dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn test_nested_namespace_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let key = store.put("documents/3", "plan.pdf", b"%PDF").await.unwrap();
        assert!(key.starts_with("documents/3/"));
        assert!(dir.path().join(&key).is_file());
    }

    #[tokio::test]
    async fn test_namespace_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let err = store.put("../elsewhere", "a.txt", b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.delete("7/never-written.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let err = store.delete("../outside.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(store.delete("/etc/hosts").await.is_err());
    }
}
