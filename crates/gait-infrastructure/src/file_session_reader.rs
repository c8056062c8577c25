//! Session reader backed by a JSON export.
//!
//! Reads a file holding a JSON array of panel chats, as produced by an editor
//! extension dumping its live session. Each call re-reads the file.

use std::path::PathBuf;

use async_trait::async_trait;
use gait_core::error::{GaitError, Result};
use gait_core::reader::SessionReader;
use gait_core::state::PanelChat;

#[derive(Debug, Clone)]
pub struct FileSessionReader {
    path: PathBuf,
}

impl FileSessionReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionReader for FileSessionReader {
    async fn parse_panel_chats(&self) -> Result<Vec<PanelChat>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GaitError::reader(format!("Failed to read session export {}: {}", self.path.display(), e))
        })?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            GaitError::reader(format!(
                "Session export {} is not a panel chat array: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_panel_chats() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        tokio::fs::write(
            &path,
            r#"[{"id": "c1", "ai_editor": "Cursor", "messages": [
                {"id": "m1", "messageText": "q", "responseText": "a", "timestamp": "t"}
            ]}]"#,
        )
        .await
        .unwrap();

        let chats = FileSessionReader::new(&path).parse_panel_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].messages[0].id, "m1");
        assert!(!FileSessionReader::new(&path).match_prompts_to_diff().await.unwrap());
    }

    #[tokio::test]
    async fn test_errors_are_reader_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = FileSessionReader::new(temp_dir.path().join("none.json"));
        assert!(matches!(
            missing.parse_panel_chats().await,
            Err(GaitError::Reader(_))
        ));

        let path = temp_dir.path().join("bad.json");
        tokio::fs::write(&path, "{}").await.unwrap();
        assert!(FileSessionReader::new(&path).parse_panel_chats().await.is_err());
    }
}
