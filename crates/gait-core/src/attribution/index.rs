//! Id → origin lookup built from an [`Attribution`].

use std::collections::HashMap;

use serde::Serialize;

use super::walker::Attribution;
use crate::git::CommitInfo;

/// Where a live entity first appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    Committed { commit: CommitInfo },
    Staged,
    Uncommitted,
}

impl Origin {
    pub fn commit(&self) -> Option<&CommitInfo> {
        match self {
            Self::Committed { commit } => Some(commit),
            _ => None,
        }
    }

    /// One-line label for hover text and CLI output.
    pub fn label(&self) -> String {
        match self {
            Self::Committed { commit } => format!(
                "{} {} ({}, {})",
                commit.short_hash(),
                commit.message,
                commit.author,
                commit.date
            ),
            Self::Staged => "staged, not committed".to_string(),
            Self::Uncommitted => "not committed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributionIndex {
    messages: HashMap<String, Origin>,
    inline_chats: HashMap<String, Origin>,
}

impl AttributionIndex {
    pub fn build(attribution: &Attribution) -> Self {
        let mut index = Self::default();
        for data in &attribution.commits {
            let origin = Origin::Committed {
                commit: data.commit.clone(),
            };
            index.insert_all(
                data.message_ids(),
                data.inline_chats.iter().map(|c| c.inline_chat_id.as_str()),
                &origin,
            );
        }
        index.insert_all(
            attribution.added.message_ids(),
            attribution.added.inline_chats.iter().map(|c| c.inline_chat_id.as_str()),
            &Origin::Staged,
        );
        index.insert_all(
            attribution.uncommitted.message_ids(),
            attribution
                .uncommitted
                .inline_chats
                .iter()
                .map(|c| c.inline_chat_id.as_str()),
            &Origin::Uncommitted,
        );
        index
    }

    fn insert_all<'a>(
        &mut self,
        message_ids: impl Iterator<Item = &'a str>,
        inline_chat_ids: impl Iterator<Item = &'a str>,
        origin: &Origin,
    ) {
        for id in message_ids {
            self.messages
                .entry(id.to_string())
                .or_insert_with(|| origin.clone());
        }
        for id in inline_chat_ids {
            self.inline_chats
                .entry(id.to_string())
                .or_insert_with(|| origin.clone());
        }
    }

    pub fn message(&self, message_id: &str) -> Option<&Origin> {
        self.messages.get(message_id)
    }

    pub fn inline_chat(&self, inline_chat_id: &str) -> Option<&Origin> {
        self.inline_chats.get(inline_chat_id)
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.inline_chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
