//! Inline chat recording.
//!
//! An inline edit is observed in two steps: the editor reports the prompt and
//! selection when the session opens, then the diffs once the edit is applied.
//! The recorder buffers both and stores a single [`InlineChat`] on finish.

use std::sync::Arc;

use gait_core::error::{GaitError, Result};
use gait_core::reader::{DiffMetadata, InlineStartInfo, SessionReader};
use gait_core::state::{FileDiff, InlineChat, StateRepository};
use tokio::sync::Mutex;

#[derive(Debug)]
struct PendingInline {
    info: InlineStartInfo,
    diffs: Vec<FileDiff>,
}

pub struct InlineChatRecorder {
    reader: Arc<dyn SessionReader>,
    repository: Arc<dyn StateRepository>,
    pending: Mutex<Option<PendingInline>>,
}

impl InlineChatRecorder {
    pub fn new(reader: Arc<dyn SessionReader>, repository: Arc<dyn StateRepository>) -> Self {
        Self {
            reader,
            repository,
            pending: Mutex::new(None),
        }
    }

    /// Opens an inline session, replacing any session that was never finished.
    ///
    /// An empty `inline_chat_id` is replaced with a fresh UUID and an empty
    /// timestamp with the current time. Returns the id the session is recorded
    /// under.
    pub async fn start(&self, mut info: InlineStartInfo) -> Result<String> {
        if info.inline_chat_id.is_empty() {
            info.inline_chat_id = uuid::Uuid::new_v4().to_string();
        }
        if info.timestamp.is_empty() {
            info.timestamp = chrono::Utc::now().to_rfc3339();
        }
        self.reader.start_inline(&info).await?;

        let id = info.inline_chat_id.clone();
        let previous = self.pending.lock().await.replace(PendingInline {
            info,
            diffs: Vec::new(),
        });
        if let Some(previous) = previous {
            tracing::warn!(
                "[InlineChatRecorder] Discarding unfinished inline chat {}",
                previous.info.inline_chat_id
            );
        }
        tracing::debug!("[InlineChatRecorder] Started inline chat {}", id);
        Ok(id)
    }

    /// Attaches diffs to the open session and forwards them to the reader.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::Validation`] when no session is open.
    pub async fn push_file_diffs(&self, diffs: Vec<FileDiff>, timestamp: impl Into<String>) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let session = pending
            .as_mut()
            .ok_or_else(|| GaitError::validation("No inline chat in progress"))?;

        let metadata = DiffMetadata {
            inline_chat_id: session.info.inline_chat_id.clone(),
            timestamp: timestamp.into(),
        };
        self.reader.push_file_diffs(&diffs, &metadata).await?;
        session.diffs.extend(diffs);
        Ok(())
    }

    /// Stores the open session as an inline chat.
    ///
    /// Returns `None` when no session was open or the session produced no
    /// diffs. A chat whose id is already stored is not duplicated.
    pub async fn finish(&self) -> Result<Option<InlineChat>> {
        let Some(session) = self.pending.lock().await.take() else {
            return Ok(None);
        };
        if session.diffs.is_empty() {
            tracing::debug!(
                "[InlineChatRecorder] Inline chat {} produced no diffs",
                session.info.inline_chat_id
            );
            return Ok(None);
        }

        let info = session.info;
        let chat = InlineChat {
            inline_chat_id: info.inline_chat_id,
            prompt: info.prompt,
            file_diff: session.diffs,
            timestamp: info.timestamp,
            parent_inline_chat_id: info.parent_inline_chat_id,
            selection: info.selection,
        };
        if self.repository.append_inline_chat(chat.clone()).await? {
            tracing::info!("[InlineChatRecorder] Stored inline chat {}", chat.inline_chat_id);
        }
        Ok(Some(chat))
    }

    /// Drops the open session without storing it.
    pub async fn cancel(&self) -> bool {
        self.pending.lock().await.take().is_some()
    }

    pub async fn is_recording(&self) -> bool {
        self.pending.lock().await.is_some()
    }
}
