//! Three-way union merge of two divergent state documents.
//!
//! Used both as the Git merge driver and to resolve a state file left with
//! conflict markers. The merge is a union: nothing present on either side is
//! lost, and a tombstone recorded on either side stays in the result.
//!
//! - `panelChats`: grouped by id in first-occurrence order (ours, then
//!   theirs). On a shared id the side with strictly more messages provides the
//!   chat, ties go to ours, and the other side's missing messages are appended.
//!   The chat `kv_store` maps are merged with theirs winning collisions.
//! - `inlineChats`: first occurrence of each id wins.
//! - `deletedChats`: set union.
//! - `kv_store`: theirs wins collisions.
//! - `schemaVersion`: always ours.

pub mod conflict;

use std::collections::{HashMap, HashSet};

use crate::error::{GaitError, Result};
use crate::kv;
use crate::state::schema;
use crate::state::{InlineChat, PanelChat, StashedState};

pub use conflict::{ConflictSides, has_conflict_markers, resolve_conflicted, split_conflict_markers};

/// Merges two already validated documents.
pub fn merge_states(ours: &StashedState, theirs: &StashedState) -> StashedState {
    let mut deleted_chats = ours.deleted_chats.clone();
    deleted_chats.union_with(&theirs.deleted_chats);

    StashedState {
        panel_chats: merge_panel_chats(&ours.panel_chats, &theirs.panel_chats),
        inline_chats: merge_inline_chats(&ours.inline_chats, &theirs.inline_chats),
        schema_version: ours.schema_version.clone(),
        deleted_chats,
        kv_store: kv::merged(&ours.kv_store, &theirs.kv_store),
    }
}

fn merge_panel_chats(ours: &[PanelChat], theirs: &[PanelChat]) -> Vec<PanelChat> {
    let mut merged: Vec<PanelChat> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for chat in ours.iter().chain(theirs) {
        match positions.get(&chat.id) {
            Some(&position) => {
                let combined = union_panel_chat(&merged[position], chat);
                merged[position] = combined;
            }
            None => {
                positions.insert(chat.id.clone(), merged.len());
                let mut chat = chat.clone();
                dedup_messages(&mut chat);
                merged.push(chat);
            }
        }
    }
    merged
}

/// Union of two copies of the same panel chat. `later` wins kv collisions.
fn union_panel_chat(earlier: &PanelChat, later: &PanelChat) -> PanelChat {
    let (base, other) = if later.messages.len() > earlier.messages.len() {
        (later, earlier)
    } else {
        (earlier, later)
    };
    let mut chat = base.clone();
    dedup_messages(&mut chat);
    chat.append_new_messages(&other.messages);
    chat.kv_store = kv::merged(&earlier.kv_store, &later.kv_store);
    chat
}

fn dedup_messages(chat: &mut PanelChat) {
    let mut seen = HashSet::new();
    chat.messages.retain(|m| seen.insert(m.id.clone()));
}

fn merge_inline_chats(ours: &[InlineChat], theirs: &[InlineChat]) -> Vec<InlineChat> {
    let mut seen = HashSet::new();
    ours.iter()
        .chain(theirs)
        .filter(|chat| seen.insert(chat.inline_chat_id.clone()))
        .cloned()
        .collect()
}

fn parse_side(side: &str, text: &str) -> Result<StashedState> {
    schema::parse_strict(text)
        .map_err(|e| GaitError::merge(format!("{} side is not a valid stashed state: {}", side, e)))
}

/// Validates and merges document text as handed over by Git.
///
/// `base` is only checked for readability; the union never needs it.
///
/// # Errors
///
/// Returns [`GaitError::Merge`] when either side fails validation. Nothing is
/// merged in that case.
pub fn merge_documents(base: Option<&str>, ours: &str, theirs: &str) -> Result<StashedState> {
    if let Some(base) = base {
        if !base.trim().is_empty() && schema::parse_strict(base).is_err() {
            tracing::debug!("Ignoring unreadable merge base");
        }
    }
    let ours = parse_side("ours", ours)?;
    let theirs = parse_side("theirs", theirs)?;
    let merged = merge_states(&ours, &theirs);
    tracing::debug!(
        "Merged {} + {} panel chats into {}",
        ours.panel_chats.len(),
        theirs.panel_chats.len(),
        merged.panel_chats.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FileDiff, LineChange, Message};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state(chats: &[(&str, &[&str])]) -> StashedState {
        let mut s = StashedState::new();
        for (chat, ids) in chats {
            for id in *ids {
                s.upsert_message(chat, Message::new(*id, "q", "a"));
            }
        }
        s
    }

    fn message_ids(chat: &PanelChat) -> Vec<&str> {
        chat.messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn inline(id: &str, prompt: &str) -> InlineChat {
        InlineChat {
            inline_chat_id: id.to_string(),
            prompt: prompt.to_string(),
            file_diff: vec![FileDiff {
                file_path: "a.rs".to_string(),
                diffs: vec![LineChange::added("x")],
            }],
            timestamp: "t".to_string(),
            parent_inline_chat_id: None,
            selection: None,
        }
    }

    #[test]
    fn test_disjoint_chats_are_concatenated() {
        let a = state(&[("a1", &["m1"]), ("a2", &["m2"])]);
        let b = state(&[("b1", &["m3"])]);
        let merged = merge_states(&a, &b);
        let ids: Vec<&str> = merged.panel_chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_overlapping_chat_keeps_union() {
        let a = state(&[("c", &["m1", "m2"])]);
        let b = state(&[("c", &["m1", "m2", "m3", "m4"])]);
        let merged = merge_states(&a, &b);
        assert_eq!(merged.panel_chats.len(), 1);
        assert_eq!(message_ids(&merged.panel_chats[0]), vec!["m1", "m2", "m3", "m4"]);

        // diverged histories keep messages from both sides
        let a = state(&[("c", &["m1", "x"])]);
        let b = state(&[("c", &["m1", "y", "z"])]);
        let merged = merge_states(&a, &b);
        assert_eq!(message_ids(&merged.panel_chats[0]), vec!["m1", "y", "z", "x"]);
    }

    #[test]
    fn test_tie_prefers_ours() {
        let mut a = state(&[("c", &["m1"])]);
        a.panel_chats[0].custom_title = "ours".to_string();
        let mut b = state(&[("c", &["m2"])]);
        b.panel_chats[0].custom_title = "theirs".to_string();
        let merged = merge_states(&a, &b);
        assert_eq!(merged.panel_chats[0].custom_title, "ours");
        assert_eq!(message_ids(&merged.panel_chats[0]), vec!["m1", "m2"]);
    }

    #[test]
    fn test_merge_with_itself_has_no_duplicates() {
        let mut a = state(&[("c", &["m1", "m2"]), ("d", &["m3"])]);
        a.append_inline_chat(inline("i1", "p"));
        a.tombstone_message("m2");
        let merged = merge_states(&a, &a);
        assert_eq!(merged, a);
    }

    #[test]
    fn test_tombstones_union_and_kv_theirs_wins() {
        let mut a = state(&[("c", &["m1"])]);
        a.tombstone_message("m1");
        a.kv_store.insert("shared".to_string(), json!("ours"));
        a.kv_store.insert("only_ours".to_string(), json!(1));
        a.panel_chats[0]
            .kv_store
            .insert("k".to_string(), json!("ours"));
        a.schema_version = "1.0".to_string();

        let mut b = state(&[("c", &["m1"])]);
        b.tombstone_panel_chat("other");
        b.kv_store.insert("shared".to_string(), json!("theirs"));
        b.panel_chats[0]
            .kv_store
            .insert("k".to_string(), json!("theirs"));
        b.schema_version = "2.0".to_string();

        let merged = merge_states(&a, &b);
        assert!(merged.is_message_deleted("m1"));
        assert!(merged.is_panel_chat_deleted("other"));
        assert_eq!(merged.kv_store["shared"], json!("theirs"));
        assert_eq!(merged.kv_store["only_ours"], json!(1));
        assert_eq!(merged.panel_chats[0].kv_store["k"], json!("theirs"));
        assert_eq!(merged.schema_version, "1.0");
    }

    #[test]
    fn test_inline_chats_first_seen_wins() {
        let mut a = StashedState::new();
        a.append_inline_chat(inline("i1", "ours"));
        let mut b = StashedState::new();
        b.append_inline_chat(inline("i1", "theirs"));
        b.append_inline_chat(inline("i2", "theirs"));
        let merged = merge_states(&a, &b);
        assert_eq!(merged.inline_chats.len(), 2);
        assert_eq!(merged.inline_chats[0].prompt, "ours");
    }

    #[test]
    fn test_merge_documents_rejects_invalid_side() {
        let valid = serde_json::to_string(&StashedState::new()).unwrap();
        let err = merge_documents(None, &valid, r#"{"panelChats": 3}"#).unwrap_err();
        assert!(matches!(err, GaitError::Merge(_)));
        assert!(merge_documents(None, "not json", &valid).is_err());
        assert!(merge_documents(Some("garbage"), &valid, &valid).is_ok());
    }
}
