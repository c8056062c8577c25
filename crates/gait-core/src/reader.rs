//! Session reader contract.
//!
//! A session reader scrapes the host editor for its live conversations. The
//! core only depends on this trait; implementations live at the edges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{FileDiff, InlineSelection, PanelChat};

/// Details captured when an inline edit session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineStartInfo {
    pub inline_chat_id: String,
    pub prompt: String,
    pub file_path: String,
    #[serde(default)]
    pub selection: Option<InlineSelection>,
    #[serde(default)]
    pub parent_inline_chat_id: Option<String>,
    pub timestamp: String,
}

/// Metadata accompanying a batch of diffs pushed for an inline session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMetadata {
    pub inline_chat_id: String,
    pub timestamp: String,
}

#[async_trait]
pub trait SessionReader: Send + Sync {
    /// Conversations as the editor shows them right now, in display order.
    async fn parse_panel_chats(&self) -> Result<Vec<PanelChat>>;

    /// Notifies the reader that an inline edit started.
    async fn start_inline(&self, _info: &InlineStartInfo) -> Result<()> {
        Ok(())
    }

    /// Hands the diffs produced by an inline edit to the reader.
    async fn push_file_diffs(&self, _diffs: &[FileDiff], _metadata: &DiffMetadata) -> Result<()> {
        Ok(())
    }

    /// Whether the reader could tie the pushed diffs to a recorded prompt.
    async fn match_prompts_to_diff(&self) -> Result<bool> {
        Ok(false)
    }
}
