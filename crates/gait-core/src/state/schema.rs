//! Structural validation and self-healing for the stashed state document.
//!
//! Validation runs field by field over the raw JSON value. Scalar and map
//! fields are deserialized whole; the `panelChats` and `inlineChats` arrays are
//! read element by element, and the messages of each panel chat one by one.
//! This gives two entry points over one rule set:
//!
//! - [`validate`]: strict, any malformed field or element is an error (merge
//!   input, history snapshots).
//! - [`heal`]: lenient, a missing or malformed field is re-initialized to its
//!   default, a malformed element is dropped, and both are reported. Everything
//!   else is kept (local state file).
//!
//! Fields added in later schema revisions (`inlineChats`, `deletedChats`,
//! `kv_store`) may be absent in a valid document; `panelChats` and
//! `schemaVersion` are required.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{GaitError, Result};
use crate::kv::KvStore;
use crate::state::model::{DeletedChats, InlineChat, Message, PanelChat, StashedState};

pub const PANEL_CHATS: &str = "panelChats";
pub const INLINE_CHATS: &str = "inlineChats";
pub const SCHEMA_VERSION: &str = "schemaVersion";
pub const DELETED_CHATS: &str = "deletedChats";
pub const KV_STORE: &str = "kv_store";

const MESSAGES: &str = "messages";

/// Problem found with a single top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    Missing,
    Malformed(String),
}

/// Array element left out of the healed document, e.g. `panelChats[3].messages[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedElement {
    pub path: String,
    pub reason: String,
}

/// Outcome of [`heal`]: which fields were re-initialized and which elements
/// were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealReport {
    pub repaired: Vec<(&'static str, FieldIssue)>,
    pub dropped: Vec<DroppedElement>,
    /// The document was not a JSON object at all
    pub replaced_document: bool,
}

impl HealReport {
    fn replaced() -> Self {
        Self {
            replaced_document: true,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.repaired.is_empty() && self.dropped.is_empty() && !self.replaced_document
    }

    pub fn repaired_fields(&self) -> Vec<&'static str> {
        self.repaired.iter().map(|(name, _)| *name).collect()
    }

    pub fn dropped_paths(&self) -> Vec<&str> {
        self.dropped.iter().map(|d| d.path.as_str()).collect()
    }
}

enum Presence {
    Required,
    Optional,
}

fn field_value<'a>(
    object: &'a Map<String, Value>,
    key: &'static str,
    presence: Presence,
) -> std::result::Result<Option<&'a Value>, FieldIssue> {
    match object.get(key) {
        None | Some(Value::Null) => match presence {
            Presence::Required => Err(FieldIssue::Missing),
            Presence::Optional => Ok(None),
        },
        Some(value) => Ok(Some(value)),
    }
}

/// Collects every field of the document, recording issues instead of failing.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    issues: Vec<(&'static str, FieldIssue)>,
    dropped: Vec<DroppedElement>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            issues: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn field<T: DeserializeOwned + Default>(&mut self, key: &'static str, presence: Presence) -> T {
        let parsed = field_value(self.object, key, presence).and_then(|value| {
            value
                .map(|v| T::deserialize(v).map_err(|e| FieldIssue::Malformed(e.to_string())))
                .transpose()
        });
        match parsed {
            Ok(value) => value.unwrap_or_default(),
            Err(issue) => {
                self.issues.push((key, issue));
                T::default()
            }
        }
    }

    /// Reads an array field, keeping every element `parse` accepts.
    fn elements<T, F>(&mut self, key: &'static str, presence: Presence, mut parse: F) -> Vec<T>
    where
        F: FnMut(&Value, &str, &mut Vec<DroppedElement>) -> std::result::Result<T, String>,
    {
        let items = match field_value(self.object, key, presence) {
            Ok(None) => return Vec::new(),
            Ok(Some(Value::Array(items))) => items,
            Ok(Some(other)) => {
                self.issues.push((
                    key,
                    FieldIssue::Malformed(format!("expected an array, found {}", json_kind(other))),
                ));
                return Vec::new();
            }
            Err(issue) => {
                self.issues.push((key, issue));
                return Vec::new();
            }
        };

        let mut kept = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = format!("{}[{}]", key, index);
            match parse(item, &path, &mut self.dropped) {
                Ok(element) => kept.push(element),
                Err(reason) => self.dropped.push(DroppedElement { path, reason }),
            }
        }
        kept
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads one panel chat. A malformed message is dropped on its own; the chat
/// is only dropped when its own fields are unusable.
fn panel_chat_element(
    value: &Value,
    path: &str,
    dropped: &mut Vec<DroppedElement>,
) -> std::result::Result<PanelChat, String> {
    if let Ok(chat) = PanelChat::deserialize(value) {
        return Ok(chat);
    }
    let mut object = value
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", json_kind(value)))?
        .clone();

    if let Some(Value::Array(messages)) = object.get(MESSAGES) {
        let mut kept = Vec::with_capacity(messages.len());
        for (index, message) in messages.iter().enumerate() {
            match Message::deserialize(message) {
                Ok(_) => kept.push(message.clone()),
                Err(e) => dropped.push(DroppedElement {
                    path: format!("{}.{}[{}]", path, MESSAGES, index),
                    reason: e.to_string(),
                }),
            }
        }
        object.insert(MESSAGES.to_string(), Value::Array(kept));
    }
    PanelChat::deserialize(Value::Object(object)).map_err(|e| e.to_string())
}

fn inline_chat_element(
    value: &Value,
    _path: &str,
    _dropped: &mut Vec<DroppedElement>,
) -> std::result::Result<InlineChat, String> {
    InlineChat::deserialize(value).map_err(|e| e.to_string())
}

struct DocumentRead {
    state: StashedState,
    issues: Vec<(&'static str, FieldIssue)>,
    dropped: Vec<DroppedElement>,
}

fn read_document(object: &Map<String, Value>) -> DocumentRead {
    let mut reader = FieldReader::new(object);
    let panel_chats = reader.elements(PANEL_CHATS, Presence::Required, panel_chat_element);
    let inline_chats = reader.elements(INLINE_CHATS, Presence::Optional, inline_chat_element);
    let schema_version: String = reader.field(SCHEMA_VERSION, Presence::Required);
    let deleted_chats: DeletedChats = reader.field(DELETED_CHATS, Presence::Optional);
    let kv_store: KvStore = reader.field(KV_STORE, Presence::Optional);

    let schema_version = if schema_version.is_empty() {
        StashedState::SCHEMA_VERSION.to_string()
    } else {
        schema_version
    };

    DocumentRead {
        state: StashedState {
            panel_chats,
            inline_chats,
            schema_version,
            deleted_chats,
            kv_store,
        },
        issues: reader.issues,
        dropped: reader.dropped,
    }
}

/// Strictly validates a parsed document.
///
/// # Errors
///
/// Returns [`GaitError::Validation`] naming every offending field.
pub fn validate(value: &Value) -> Result<StashedState> {
    let object = value
        .as_object()
        .ok_or_else(|| GaitError::validation("stashed state is not a JSON object"))?;
    let read = read_document(object);
    if read.issues.is_empty() && read.dropped.is_empty() {
        return Ok(read.state);
    }
    let details = read
        .issues
        .iter()
        .map(|(field, issue)| match issue {
            FieldIssue::Missing => format!("{}: missing", field),
            FieldIssue::Malformed(reason) => format!("{}: {}", field, reason),
        })
        .chain(read.dropped.iter().map(|d| format!("{}: {}", d.path, d.reason)))
        .collect::<Vec<_>>()
        .join("; ");
    Err(GaitError::validation(details))
}

/// Parses and strictly validates document text.
pub fn parse_strict(text: &str) -> Result<StashedState> {
    let value: Value = serde_json::from_str(text)?;
    validate(&value)
}

/// Checks whether `value` is a structurally valid stashed state.
pub fn is_stashed_state(value: &Value) -> bool {
    validate(value).is_ok()
}

/// Lenient read: keeps every valid field and element, defaults or drops the
/// rest.
pub fn heal(value: Value) -> (StashedState, HealReport) {
    match value.as_object() {
        Some(object) => {
            let read = read_document(object);
            (
                read.state,
                HealReport {
                    repaired: read.issues,
                    dropped: read.dropped,
                    replaced_document: false,
                },
            )
        }
        None => (StashedState::default(), HealReport::replaced()),
    }
}

/// Lenient read of document text. Unparseable text yields a default state.
pub fn heal_text(text: &str) -> (StashedState, HealReport) {
    if text.trim().is_empty() {
        return (StashedState::default(), HealReport::replaced());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => heal(value),
        Err(e) => {
            tracing::warn!("Stashed state is not valid JSON, re-initializing: {}", e);
            (StashedState::default(), HealReport::replaced())
        }
    }
}
