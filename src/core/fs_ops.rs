// src/core/fs_ops.rs
//! File system operations shared by logging and diagnostics

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct FsOps;

impl FsOps {
    /// Ensure directory exists
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            debug!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Write bytes, creating the parent directory when needed
    pub async fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))
    }

    /// First free path among `<stem>.<ext>`, `<stem>-1.<ext>`, `<stem>-2.<ext>`, ...
    pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if !candidate.exists() {
            return candidate;
        }

        (1..)
            .map(|n| dir.join(format!("{}-{}.{}", stem, n, ext)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_path_appends_suffix_on_collision() {
        let dir = tempfile::tempdir().unwrap();

        let first = FsOps::unique_path(dir.path(), "error-20240101-120000", "png");
        assert_eq!(first, dir.path().join("error-20240101-120000.png"));

        std::fs::write(&first, b"png").unwrap();
        let second = FsOps::unique_path(dir.path(), "error-20240101-120000", "png");
        assert_eq!(second, dir.path().join("error-20240101-120000-1.png"));
    }

    #[tokio::test]
    async fn test_write_bytes_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shot.png");

        FsOps::write_bytes(&path, b"\x89PNG").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }
}
