//! Stashed state domain models.
//!
//! Contains the persisted conversation document: panel chats, inline chats,
//! deletion tombstones and the open key-value annotation maps.
//!
//! Field names follow the on-disk JSON schema, which mixes camelCase and
//! snake_case keys, so every renamed field carries an explicit `serde(rename)`.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::kv::KvStore;

/// Reads an explicit `null` as the field's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One turn of a conversation.
///
/// `id` is the sole join key used by matching, deletion and attribution and
/// never changes once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable, globally unique message identifier
    pub id: String,
    /// The prompt text sent by the user
    #[serde(rename = "messageText")]
    pub message_text: String,
    /// The AI reply, may contain fenced code blocks
    #[serde(rename = "responseText")]
    pub response_text: String,
    /// Model label reported by the editor
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    /// Timestamp when the message was produced (ISO 8601 format)
    pub timestamp: String,
    /// Code references consulted when generating the response
    #[serde(default)]
    pub context: Vec<Context>,
    /// Auxiliary annotations (e.g. `file_paths`)
    #[serde(default, deserialize_with = "null_as_default")]
    pub kv_store: KvStore,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        message_text: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            message_text: message_text.into(),
            response_text: response_text.into(),
            model: String::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            context: Vec::new(),
            kv_store: KvStore::new(),
        }
    }
}

/// Known values of [`Context::context_type`].
pub mod context_type {
    pub const SELECTION: &str = "selection";
    pub const FILE: &str = "file";
    pub const FOLDER: &str = "folder";
}

/// A reference to surrounding code used as prompt context.
///
/// The shape of `value` depends on `context_type` (URI, range, text payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub context_type: String,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// A multi-turn AI conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelChat {
    /// Unique conversation identifier
    pub id: String,
    /// Source tool label (e.g. "Cursor", "Copilot")
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_editor: String,
    #[serde(rename = "customTitle", default, deserialize_with = "null_as_default")]
    pub custom_title: String,
    /// Conversation this one continues. Weak reference, may dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_on: String,
    /// Messages in insertion order
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kv_store: KvStore,
}

impl PanelChat {
    /// Creates an empty panel chat stamped with the current time.
    pub fn new(id: impl Into<String>, ai_editor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ai_editor: ai_editor.into(),
            custom_title: String::new(),
            parent_id: None,
            created_on: chrono::Utc::now().to_rfc3339(),
            messages: Vec::new(),
            kv_store: KvStore::new(),
        }
    }

    pub fn message_ids(&self) -> HashSet<&str> {
        self.messages.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn contains_message(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Appends every message of `incoming` whose id is not present yet.
    ///
    /// Existing messages are never overwritten. Returns the number appended.
    pub fn append_new_messages<'a, I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut known: HashSet<String> = self.messages.iter().map(|m| m.id.clone()).collect();
        let mut appended = 0;
        for message in incoming {
            if known.insert(message.id.clone()) {
                self.messages.push(message.clone());
                appended += 1;
            }
        }
        appended
    }
}

/// A single inline edit scoped to one file region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineChat {
    pub inline_chat_id: String,
    pub prompt: String,
    /// Per-file diff records produced by the edit
    pub file_diff: Vec<FileDiff>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_inline_chat_id: Option<String>,
    /// Selection captured when the inline session started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<InlineSelection>,
}

impl InlineChat {
    /// Added lines recorded for `file_path`, in diff order.
    pub fn added_lines_for(&self, file_path: &str) -> Vec<String> {
        self.file_diff
            .iter()
            .filter(|diff| paths_refer_to_same_file(&diff.file_path, file_path))
            .flat_map(|diff| diff.added_lines())
            .collect()
    }

    pub fn touches_file(&self, file_path: &str) -> bool {
        self.file_diff
            .iter()
            .any(|diff| paths_refer_to_same_file(&diff.file_path, file_path))
    }
}

/// Diff of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_path: String,
    pub diffs: Vec<LineChange>,
}

impl FileDiff {
    /// Lines introduced by this diff. A change record may span several lines.
    pub fn added_lines(&self) -> Vec<String> {
        self.diffs
            .iter()
            .filter(|change| change.added)
            .flat_map(|change| change.value.lines().map(str::to_string))
            .collect()
    }
}

/// One add/remove/context record. Context records have neither flag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChange {
    pub value: String,
    #[serde(default)]
    pub added: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl LineChange {
    pub fn added(value: impl Into<String>) -> Self {
        Self::with_flags(value, true, false)
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self::with_flags(value, false, true)
    }

    pub fn unchanged(value: impl Into<String>) -> Self {
        Self::with_flags(value, false, false)
    }

    fn with_flags(value: impl Into<String>, added: bool, removed: bool) -> Self {
        let value = value.into();
        let count = Some(value.lines().count());
        Self {
            value,
            added,
            removed,
            count,
        }
    }
}

/// Selection range metadata captured when an inline chat starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineSelection {
    #[serde(rename = "startSelection")]
    pub start: Position,
    #[serde(rename = "endSelection")]
    pub end: Position,
    #[serde(rename = "selectionText", default)]
    pub text: String,
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Deletion tombstones.
///
/// Entities listed here stay physically present in the document and in Git
/// history but are treated as absent by every read path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletedChats {
    #[serde(rename = "deletedMessageIDs", default)]
    pub deleted_message_ids: BTreeSet<String>,
    #[serde(rename = "deletedPanelChatIDs", default)]
    pub deleted_panel_chat_ids: BTreeSet<String>,
}

impl DeletedChats {
    /// Adds every tombstone of `other`. Tombstones are never removed.
    pub fn union_with(&mut self, other: &DeletedChats) {
        self.deleted_message_ids
            .extend(other.deleted_message_ids.iter().cloned());
        self.deleted_panel_chat_ids
            .extend(other.deleted_panel_chat_ids.iter().cloned());
    }
}

/// Result of [`StashedState::upsert_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The message was appended to an existing panel chat
    Appended,
    /// A new panel chat wrapping the message was created
    CreatedChat,
    /// A message with the same id already existed; nothing changed
    AlreadyPresent,
}

impl UpsertOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, Self::AlreadyPresent)
    }
}

/// The root persisted document for a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashedState {
    #[serde(rename = "panelChats")]
    pub panel_chats: Vec<PanelChat>,
    #[serde(rename = "inlineChats")]
    pub inline_chats: Vec<InlineChat>,
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(rename = "deletedChats")]
    pub deleted_chats: DeletedChats,
    pub kv_store: KvStore,
}

impl Default for StashedState {
    fn default() -> Self {
        Self {
            panel_chats: Vec::new(),
            inline_chats: Vec::new(),
            schema_version: Self::SCHEMA_VERSION.to_string(),
            deleted_chats: DeletedChats::default(),
            kv_store: KvStore::new(),
        }
    }
}

impl StashedState {
    /// Schema version written by this implementation.
    pub const SCHEMA_VERSION: &'static str = "1.0";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_panel_chat(&self, panel_chat_id: &str) -> Option<&PanelChat> {
        self.panel_chats.iter().find(|c| c.id == panel_chat_id)
    }

    pub fn find_panel_chat_mut(&mut self, panel_chat_id: &str) -> Option<&mut PanelChat> {
        self.panel_chats.iter_mut().find(|c| c.id == panel_chat_id)
    }

    pub fn find_inline_chat(&self, inline_chat_id: &str) -> Option<&InlineChat> {
        self.inline_chats
            .iter()
            .find(|c| c.inline_chat_id == inline_chat_id)
    }

    /// Idempotent append of `message` into the panel chat `panel_chat_id`.
    ///
    /// Creates the panel chat when it does not exist yet.
    pub fn upsert_message(&mut self, panel_chat_id: &str, message: Message) -> UpsertOutcome {
        match self.find_panel_chat_mut(panel_chat_id) {
            Some(chat) if chat.contains_message(&message.id) => UpsertOutcome::AlreadyPresent,
            Some(chat) => {
                chat.messages.push(message);
                UpsertOutcome::Appended
            }
            None => {
                let mut chat = PanelChat::new(panel_chat_id, "");
                chat.messages.push(message);
                self.panel_chats.push(chat);
                UpsertOutcome::CreatedChat
            }
        }
    }

    /// Appends an inline chat unless one with the same id is already stored.
    pub fn append_inline_chat(&mut self, chat: InlineChat) -> bool {
        if self.find_inline_chat(&chat.inline_chat_id).is_some() {
            return false;
        }
        self.inline_chats.push(chat);
        true
    }

    /// Records a message tombstone. Returns `false` if it was already present.
    pub fn tombstone_message(&mut self, message_id: &str) -> bool {
        self.deleted_chats
            .deleted_message_ids
            .insert(message_id.to_string())
    }

    /// Records a panel chat tombstone. Returns `false` if it was already present.
    pub fn tombstone_panel_chat(&mut self, panel_chat_id: &str) -> bool {
        self.deleted_chats
            .deleted_panel_chat_ids
            .insert(panel_chat_id.to_string())
    }

    pub fn is_message_deleted(&self, message_id: &str) -> bool {
        self.deleted_chats.deleted_message_ids.contains(message_id)
    }

    pub fn is_panel_chat_deleted(&self, panel_chat_id: &str) -> bool {
        self.deleted_chats
            .deleted_panel_chat_ids
            .contains(panel_chat_id)
    }

    /// Panel chats as exposed to readers: tombstoned chats are dropped and
    /// tombstoned messages filtered out of the remaining ones.
    pub fn visible_panel_chats(&self) -> Vec<PanelChat> {
        self.panel_chats
            .iter()
            .filter(|chat| !self.is_panel_chat_deleted(&chat.id))
            .map(|chat| {
                let mut chat = chat.clone();
                chat.messages
                    .retain(|m| !self.is_message_deleted(&m.id));
                chat
            })
            .collect()
    }

    /// Copy of the document with every tombstoned entity removed.
    ///
    /// The tombstone sets themselves are kept so the result can still be
    /// merged without resurrecting anything.
    pub fn visible(&self) -> StashedState {
        StashedState {
            panel_chats: self.visible_panel_chats(),
            ..self.clone()
        }
    }

    pub fn message_count(&self) -> usize {
        self.panel_chats.iter().map(|c| c.messages.len()).sum()
    }
}

/// Compares a stored diff path with a document path.
///
/// Stored paths may be absolute or workspace-relative, so a path matches when
/// either one is a suffix of the other on a component boundary.
pub fn paths_refer_to_same_file(stored: &str, document: &str) -> bool {
    let stored = stored.replace('\\', "/");
    let document = document.replace('\\', "/");
    if stored == document {
        return true;
    }
    let (long, short) = if stored.len() >= document.len() {
        (&stored, &document)
    } else {
        (&document, &stored)
    };
    !short.is_empty() && long.ends_with(short.as_str()) && {
        let prefix = &long[..long.len() - short.len()];
        prefix.ends_with('/') || short.starts_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Message {
        Message::new(id, format!("prompt {}", id), format!("response {}", id))
    }

    #[test]
    fn test_default_state() {
        let state = StashedState::new();
        assert!(state.panel_chats.is_empty());
        assert!(state.inline_chats.is_empty());
        assert_eq!(state.schema_version, "1.0");
        assert!(state.deleted_chats.deleted_message_ids.is_empty());
    }

    #[test]
    fn test_upsert_message_is_idempotent() {
        let mut state = StashedState::new();
        assert_eq!(
            state.upsert_message("chat-1", message("m1")),
            UpsertOutcome::CreatedChat
        );
        assert_eq!(
            state.upsert_message("chat-1", message("m1")),
            UpsertOutcome::AlreadyPresent
        );
        assert_eq!(
            state.upsert_message("chat-1", message("m2")),
            UpsertOutcome::Appended
        );

        let chat = state.find_panel_chat("chat-1").unwrap();
        let ids: Vec<&str> = chat.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_tombstones_filter_visible_chats() {
        let mut state = StashedState::new();
        state.upsert_message("chat-1", message("m1"));
        state.upsert_message("chat-1", message("m2"));
        state.upsert_message("chat-2", message("m3"));

        assert!(state.tombstone_message("m1"));
        assert!(!state.tombstone_message("m1"));
        assert!(state.tombstone_panel_chat("chat-2"));

        let visible = state.visible_panel_chats();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].messages.len(), 1);
        assert_eq!(visible[0].messages[0].id, "m2");
        // physically still present
        assert_eq!(state.message_count(), 3);
    }

    #[test]
    fn test_append_new_messages_keeps_order_and_skips_known() {
        let mut chat = PanelChat::new("c", "Cursor");
        chat.messages.push(message("a"));
        let incoming = vec![message("a"), message("b"), message("c"), message("b")];
        assert_eq!(chat.append_new_messages(&incoming), 2);
        let ids: Vec<&str> = chat.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_inline_chat_added_lines() {
        let chat = InlineChat {
            inline_chat_id: "i1".to_string(),
            prompt: "rename".to_string(),
            file_diff: vec![FileDiff {
                file_path: "/repo/src/lib.rs".to_string(),
                diffs: vec![
                    LineChange::unchanged("fn a() {}\n"),
                    LineChange::removed("let x = 1;\n"),
                    LineChange::added("let y = 1;\nlet z = 2;\n"),
                ],
            }],
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            parent_inline_chat_id: None,
            selection: None,
        };
        assert_eq!(
            chat.added_lines_for("src/lib.rs"),
            vec!["let y = 1;".to_string(), "let z = 2;".to_string()]
        );
        assert!(chat.added_lines_for("src/main.rs").is_empty());
    }

    #[test]
    fn test_paths_refer_to_same_file() {
        assert!(paths_refer_to_same_file("/repo/src/lib.rs", "src/lib.rs"));
        assert!(paths_refer_to_same_file("src\\lib.rs", "src/lib.rs"));
        assert!(!paths_refer_to_same_file("/repo/src/mylib.rs", "lib.rs"));
        assert!(!paths_refer_to_same_file("/repo/a.rs", ""));
    }

    #[test]
    fn test_json_field_names() {
        let mut state = StashedState::new();
        state.upsert_message("chat-1", message("m1"));
        state.tombstone_message("gone");
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("panelChats").is_some());
        assert!(json.get("inlineChats").is_some());
        assert_eq!(json["schemaVersion"], "1.0");
        assert_eq!(json["deletedChats"]["deletedMessageIDs"][0], "gone");
        assert!(json["panelChats"][0]["messages"][0].get("messageText").is_some());
        assert!(json["panelChats"][0].get("customTitle").is_some());
    }
}
