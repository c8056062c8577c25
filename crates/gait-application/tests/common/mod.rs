//! In-memory fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gait_core::error::{GaitError, Result};
use gait_core::git::{CommitInfo, GitHistory};
use gait_core::reader::{DiffMetadata, InlineStartInfo, SessionReader};
use gait_core::state::{FileDiff, Message, PanelChat, StashedState, StateRepository};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<StashedState>,
    writes: AtomicUsize,
}

impl MemoryRepository {
    pub fn with_state(state: StashedState) -> Self {
        Self {
            state: RwLock::new(state),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> StashedState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl StateRepository for MemoryRepository {
    async fn read(&self) -> Result<StashedState> {
        Ok(self.state.read().await.clone())
    }

    async fn write(&self, state: &StashedState) -> Result<()> {
        *self.state.write().await = state.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session reader returning a scripted set of chats.
#[derive(Default)]
pub struct ScriptedReader {
    chats: Mutex<Vec<PanelChat>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    pub started: Mutex<Vec<InlineStartInfo>>,
    pub pushed: Mutex<Vec<(usize, DiffMetadata)>>,
}

impl ScriptedReader {
    pub fn new(chats: Vec<PanelChat>) -> Self {
        Self {
            chats: Mutex::new(chats),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_chats(&self, chats: Vec<PanelChat>) {
        *self.chats.lock().unwrap() = chats;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionReader for ScriptedReader {
    async fn parse_panel_chats(&self) -> Result<Vec<PanelChat>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(GaitError::reader("editor storage unavailable"));
        }
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn start_inline(&self, info: &InlineStartInfo) -> Result<()> {
        self.started.lock().unwrap().push(info.clone());
        Ok(())
    }

    async fn push_file_diffs(&self, diffs: &[FileDiff], metadata: &DiffMetadata) -> Result<()> {
        self.pushed.lock().unwrap().push((diffs.len(), metadata.clone()));
        Ok(())
    }
}

/// Git history served from memory. Commits are listed oldest first.
#[derive(Default)]
pub struct FakeGit {
    pub commits: Vec<CommitInfo>,
    pub blobs: HashMap<String, Vec<u8>>,
    pub staged: Option<Vec<u8>>,
}

impl FakeGit {
    pub fn commit(&mut self, hash: &str, message: &str, path: &str, content: Vec<u8>) {
        self.commits.push(CommitInfo {
            hash: hash.to_string(),
            author: "Ada".to_string(),
            date: "2024-05-01T10:00:00+00:00".to_string(),
            message: message.to_string(),
            path: path.to_string(),
        });
        self.blobs.insert(format!("{}:{}", hash, path), content);
    }
}

#[async_trait]
impl GitHistory for FakeGit {
    async fn is_repository(&self) -> Result<bool> {
        Ok(true)
    }

    async fn file_history(&self, _path: &str) -> Result<Vec<CommitInfo>> {
        Ok(self.commits.clone())
    }

    async fn show_file_at(&self, commit: &str, path: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(&format!("{}:{}", commit, path))
            .cloned()
            .ok_or_else(|| GaitError::git(format!("path '{}' does not exist in '{}'", path, commit)))
    }

    async fn show_staged_file(&self, _path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.staged.clone())
    }
}

pub fn message(id: &str, prompt: &str, response: &str) -> Message {
    Message::new(id, prompt, response)
}

pub fn panel_chat(id: &str, messages: Vec<Message>) -> PanelChat {
    let mut chat = PanelChat::new(id, "Cursor");
    chat.messages = messages;
    chat
}

pub fn state_with(chats: Vec<PanelChat>) -> StashedState {
    let mut state = StashedState::new();
    state.panel_chats = chats;
    state
}

pub fn to_json(state: &StashedState) -> Vec<u8> {
    serde_json::to_vec_pretty(state).unwrap()
}

pub fn inline_chat(id: &str, file_path: &str, added: &[&str]) -> gait_core::state::InlineChat {
    gait_core::state::InlineChat {
        inline_chat_id: id.to_string(),
        prompt: format!("prompt for {}", id),
        file_diff: vec![FileDiff {
            file_path: file_path.to_string(),
            diffs: added
                .iter()
                .map(|line| gait_core::state::LineChange::added(*line))
                .collect(),
        }],
        timestamp: "2024-05-01T10:00:00Z".to_string(),
        parent_inline_chat_id: None,
        selection: None,
    }
}
