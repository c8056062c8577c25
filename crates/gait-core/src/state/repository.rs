//! State repository trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::state::model::{InlineChat, Message, StashedState, UpsertOutcome};

/// Repository owning the persisted stashed state document.
///
/// Every mutating helper is a full read-modify-write against the latest stored
/// document, so callers never mutate a stale copy. There is no locking: the
/// store assumes one active writer per workspace.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Loads the document.
    ///
    /// Implementations must not fail on a missing, empty or corrupt document;
    /// they re-initialize the broken parts and persist the result instead.
    async fn read(&self) -> Result<StashedState>;

    /// Persists the whole document.
    async fn write(&self, state: &StashedState) -> Result<()>;

    /// Idempotently appends `message` to `panel_chat_id`, creating the chat if needed.
    async fn upsert_message(&self, panel_chat_id: &str, message: Message) -> Result<UpsertOutcome> {
        let mut state = self.read().await?;
        let outcome = state.upsert_message(panel_chat_id, message);
        if outcome.changed() {
            self.write(&state).await?;
        }
        Ok(outcome)
    }

    /// Adds a message tombstone. Returns `false` if it was already tombstoned.
    async fn tombstone_message(&self, message_id: &str) -> Result<bool> {
        let mut state = self.read().await?;
        let added = state.tombstone_message(message_id);
        if added {
            self.write(&state).await?;
        }
        Ok(added)
    }

    /// Adds a panel chat tombstone. Returns `false` if it was already tombstoned.
    async fn tombstone_panel_chat(&self, panel_chat_id: &str) -> Result<bool> {
        let mut state = self.read().await?;
        let added = state.tombstone_panel_chat(panel_chat_id);
        if added {
            self.write(&state).await?;
        }
        Ok(added)
    }

    /// Appends an inline chat unless its id is already stored.
    async fn append_inline_chat(&self, chat: InlineChat) -> Result<bool> {
        let mut state = self.read().await?;
        let added = state.append_inline_chat(chat);
        if added {
            self.write(&state).await?;
        }
        Ok(added)
    }
}
