use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Document written to a snippet file that does not exist yet.
pub const EMPTY_DOCUMENT: &str = "{}";

/// A per-language snippet file on disk.
#[derive(Debug, Clone)]
pub struct SnippetFile {
    path: PathBuf,
}

impl SnippetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file holding an empty object if it is missing.
    /// Returns `true` when the file was created.
    pub async fn ensure_exists(&self) -> Result<bool> {
        if tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check {}", self.path.display()))?
        {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, EMPTY_DOCUMENT)
            .await
            .with_context(|| format!("Failed to create snippet file: {}", self.path.display()))?;

        tracing::info!("Created snippet file {}", self.path.display());
        Ok(true)
    }

    pub async fn read(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snippet file: {}", self.path.display()))
    }

    pub async fn write(&self, text: &str) -> Result<()> {
        tokio::fs::write(&self.path, text)
            .await
            .with_context(|| format!("Failed to write snippet file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_exists_bootstraps_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnippetFile::new(dir.path().join("User").join("snippets").join("rust.json"));

        assert!(file.ensure_exists().await.unwrap());
        assert_eq!(file.read().await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_ensure_exists_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnippetFile::new(dir.path().join("rust.json"));
        file.write("{ \"a\": {} }").await.unwrap();

        assert!(!file.ensure_exists().await.unwrap());
        assert_eq!(file.read().await.unwrap(), "{ \"a\": {} }");
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnippetFile::new(dir.path().join("missing.json"));

        let err = file.read().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read snippet file"));
    }
}
