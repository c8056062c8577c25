//! Atomic whole-file replacement.
//!
//! Writes go to a hidden temporary sibling which is synced and then renamed
//! over the target, so readers see either the old or the new document.
//! There is no file lock.

use std::path::{Path, PathBuf};

use gait_core::error::{GaitError, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Handle to a file that is always replaced in one step.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file. Returns `None` when it does not exist.
    pub async fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GaitError::io(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Replaces the file contents atomically, creating parent directories.
    pub async fn save(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.temp_path()?;
        let mut tmp_file = fs::File::create(&tmp_path).await?;
        tmp_file.write_all(bytes).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(GaitError::io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| GaitError::io(format!("Path has no file name: {}", self.path.display())))?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(match self.path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("nested").join("state.json"));

        assert!(file.load().await.unwrap().is_none());
        file.save(b"first").await.unwrap();
        file.save(b"second").await.unwrap();
        assert_eq!(file.load().await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("state.json"));
        file.save(b"{}").await.unwrap();

        assert!(!temp_dir.path().join(".state.json.tmp").exists());
        assert!(temp_dir.path().join("state.json").exists());
    }
}
