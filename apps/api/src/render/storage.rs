//! Generated PDFs on disk, addressed by `<uuid>.pdf`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file {0} does not exist")]
    NotFound(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    /// Uses `dir` for output, creating it when missing.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` under a fresh name and returns that name.
    pub async fn save_pdf(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let filename = format!("{}.pdf", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        debug!(%filename, bytes = bytes.len(), "PDF stored");
        Ok(filename)
    }

    pub async fn load_pdf(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self
            .resolve(filename)
            .ok_or_else(|| StoreError::NotFound(filename.to_string()))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Only names this store could have produced resolve to a path.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let stem = filename.strip_suffix(".pdf")?;
        let id = Uuid::parse_str(stem).ok()?;
        (id.hyphenated().to_string() == stem).then(|| self.dir.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();

        let name = store.save_pdf(b"%PDF-1.7 test").await.unwrap();
        assert!(name.ends_with(".pdf"));
        assert_eq!(store.load_pdf(&name).await.unwrap(), b"%PDF-1.7 test");
    }

    #[tokio::test]
    async fn test_unknown_uuid_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path()).unwrap();
        let name = format!("{}.pdf", Uuid::new_v4());
        assert!(matches!(
            store.load_pdf(&name).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("secret.pdf"), b"secret").unwrap();

        for name in ["../secret.pdf", "secret.pdf", "/etc/passwd", "x.pdf.pdf", ""] {
            assert!(
                matches!(store.load_pdf(name).await, Err(StoreError::NotFound(_))),
                "{name} should not resolve"
            );
        }
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = OutputStore::new(&nested).unwrap();
        assert!(store.dir().is_dir());
    }
}
