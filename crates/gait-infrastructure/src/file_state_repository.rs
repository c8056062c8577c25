//! File-backed stashed state repository.

use async_trait::async_trait;
use gait_core::error::Result;
use gait_core::merge;
use gait_core::state::schema;
use gait_core::state::{StashedState, StateRepository};

use crate::paths::GaitPaths;
use crate::storage::atomic_file::AtomicFile;
use crate::storage::codec;

/// Stores the whole document as one JSON file, optionally gzip-compressed.
///
/// Every read goes to disk, so two repositories on the same path observe each
/// other's writes (last write wins).
#[derive(Debug, Clone)]
pub struct FileStateRepository {
    file: AtomicFile,
    compress: bool,
}

impl FileStateRepository {
    pub fn new(paths: &GaitPaths, compress: bool) -> Self {
        Self {
            file: AtomicFile::new(paths.state_file()),
            compress,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(self.file.path()).await.unwrap_or(false)
    }

    /// Writes an empty document unless one is already present.
    ///
    /// Returns `true` when a new file was created.
    pub async fn initialize(&self) -> Result<bool> {
        if self.exists().await {
            return Ok(false);
        }
        self.write(&StashedState::default()).await?;
        tracing::info!("Initialized state file at {}", self.file.path().display());
        Ok(true)
    }
}

#[async_trait]
impl StateRepository for FileStateRepository {
    async fn read(&self) -> Result<StashedState> {
        let Some(bytes) = self.file.load().await? else {
            tracing::debug!("State file missing, creating {}", self.file.path().display());
            let state = StashedState::default();
            self.write(&state).await?;
            return Ok(state);
        };

        let text = match codec::decode(&bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Unreadable state file, re-initializing: {}", e);
                String::new()
            }
        };
        if merge::has_conflict_markers(&text) {
            // Healing would throw both sides away; merge them or leave the file alone.
            let state = merge::resolve_conflicted(&text)?;
            self.write(&state).await?;
            tracing::info!(
                "Resolved conflict markers in {} ({} panel chats)",
                self.file.path().display(),
                state.panel_chats.len()
            );
            return Ok(state);
        }

        let (state, report) = schema::heal_text(&text);
        if !report.is_clean() {
            tracing::warn!(
                "Repaired state file fields {:?}, dropped {:?} (document replaced: {})",
                report.repaired_fields(),
                report.dropped_paths(),
                report.replaced_document
            );
            self.write(&state).await?;
        }
        Ok(state)
    }

    async fn write(&self, state: &StashedState) -> Result<()> {
        let text = serde_json::to_string_pretty(state)?;
        let bytes = codec::encode(&text, self.compress)?;
        self.file.save(&bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gait_core::state::Message;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn repository(dir: &TempDir, compress: bool) -> FileStateRepository {
        FileStateRepository::new(&GaitPaths::new(dir.path()), compress)
    }

    #[tokio::test]
    async fn test_missing_file_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);
        assert!(!repo.exists().await);

        let state = repo.read().await.unwrap();
        assert_eq!(state, StashedState::default());
        assert!(repo.exists().await);
    }

    #[tokio::test]
    async fn test_round_trip_plain_and_compressed() {
        for compress in [false, true] {
            let temp_dir = TempDir::new().unwrap();
            let repo = repository(&temp_dir, compress);

            let mut state = StashedState::new();
            state.upsert_message("c1", Message::new("m1", "q", "a"));
            state.tombstone_message("m0");
            repo.write(&state).await.unwrap();

            let once = repo.read().await.unwrap();
            repo.write(&once).await.unwrap();
            let twice = repo.read().await.unwrap();
            assert_eq!(twice, state);

            let raw = tokio::fs::read(repo.path()).await.unwrap();
            assert_eq!(codec::is_gzip(&raw), compress);
        }
    }

    #[tokio::test]
    async fn test_compressed_file_read_by_plain_repository() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = StashedState::new();
        state.upsert_message("c1", Message::new("m1", "q", "a"));
        repository(&temp_dir, true).write(&state).await.unwrap();

        assert_eq!(repository(&temp_dir, false).read().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_corrupt_fields_are_healed_and_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);
        tokio::fs::create_dir_all(repo.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(
            repo.path(),
            r#"{"panelChats": [], "schemaVersion": "1.0", "deletedChats": "oops", "inlineChats": 7}"#,
        )
        .await
        .unwrap();

        let state = repo.read().await.unwrap();
        assert!(state.inline_chats.is_empty());
        assert!(state.deleted_chats.deleted_message_ids.is_empty());

        let text = tokio::fs::read_to_string(repo.path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["deletedChats"].is_object());
        assert!(value["inlineChats"].is_array());
    }

    #[tokio::test]
    async fn test_garbage_file_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);
        tokio::fs::create_dir_all(repo.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(repo.path(), "not json at all").await.unwrap();

        assert_eq!(repo.read().await.unwrap(), StashedState::default());
        assert!(!repo.initialize().await.unwrap());
    }

    async fn write_raw(repo: &FileStateRepository, text: &str) {
        tokio::fs::create_dir_all(repo.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(repo.path(), text).await.unwrap();
    }

    const CONFLICTED: &str = r#"{
  "panelChats": [
<<<<<<< HEAD
    {"id": "c1", "messages": [{"id": "m1", "messageText": "q", "responseText": "a", "timestamp": "t"}]}
=======
    {"id": "c2", "messages": [{"id": "m2", "messageText": "q", "responseText": "a", "timestamp": "t"}]}
>>>>>>> feature
  ],
  "schemaVersion": "1.0"
}
"#;

    #[tokio::test]
    async fn test_conflicted_file_is_merged_not_reset() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);
        write_raw(&repo, CONFLICTED).await;

        let state = repo.read().await.unwrap();
        let ids: Vec<&str> = state.panel_chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let on_disk = tokio::fs::read_to_string(repo.path()).await.unwrap();
        assert!(!merge::has_conflict_markers(&on_disk));
        assert!(on_disk.contains("\"c1\"") && on_disk.contains("\"c2\""));
    }

    #[tokio::test]
    async fn test_unresolvable_conflict_is_left_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);
        let broken = CONFLICTED.replace("\"messages\": [{\"id\": \"m2\"", "\"messages\": [{\"id\": 2");
        write_raw(&repo, &broken).await;

        assert!(repo.read().await.is_err());
        let on_disk = tokio::fs::read_to_string(repo.path()).await.unwrap();
        assert_eq!(on_disk, broken);
    }

    #[tokio::test]
    async fn test_one_bad_chat_does_not_erase_the_others() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repository(&temp_dir, false);

        let mut state = StashedState::new();
        for i in 0..50 {
            state.upsert_message(&format!("c{}", i), Message::new(format!("m{}", i), "q", "a"));
        }
        let mut value = serde_json::to_value(&state).unwrap();
        value["panelChats"][7]["customTitle"] = serde_json::Value::Null;
        value["panelChats"][9]["messages"][0]
            .as_object_mut()
            .unwrap()
            .remove("timestamp");
        write_raw(&repo, &value.to_string()).await;

        let healed = repo.read().await.unwrap();
        assert_eq!(healed.panel_chats.len(), 50);
        assert_eq!(healed.panel_chats[7].custom_title, "");
        assert!(healed.panel_chats[9].messages.is_empty());

        let persisted: StashedState =
            serde_json::from_str(&tokio::fs::read_to_string(repo.path()).await.unwrap()).unwrap();
        assert_eq!(persisted.panel_chats.len(), 50);
        assert_eq!(persisted.panel_chats[8].messages[0].id, "m8");
    }

    #[tokio::test]
    async fn test_helpers_read_latest_document() {
        let temp_dir = TempDir::new().unwrap();
        let first = repository(&temp_dir, false);
        let second = repository(&temp_dir, false);

        first
            .upsert_message("c1", Message::new("m1", "q", "a"))
            .await
            .unwrap();
        second
            .upsert_message("c1", Message::new("m2", "q", "a"))
            .await
            .unwrap();

        let state = first.read().await.unwrap();
        let ids: Vec<&str> = state.panel_chats[0]
            .messages
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }
}
