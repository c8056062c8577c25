//! First-seen-wins history walk.

use std::collections::HashSet;

use serde::Serialize;

use crate::git::CommitInfo;
use crate::state::{InlineChat, Message, PanelChat, StashedState};

/// A parsed state file as of one commit.
#[derive(Debug, Clone)]
pub struct HistoricalSnapshot {
    pub commit: CommitInfo,
    pub state: StashedState,
}

/// Which entity kinds the walk attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub panel_chats: bool,
    pub inline_chats: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            panel_chats: true,
            inline_chats: true,
        }
    }
}

/// Ids that are still live in the current document.
///
/// Built from the working copy, never from HEAD, so that an entity deleted
/// today disappears from every historical commit as well.
#[derive(Debug, Clone, Default)]
pub struct LiveSet {
    message_ids: HashSet<String>,
    panel_chat_ids: HashSet<String>,
    inline_chat_ids: HashSet<String>,
    deleted_message_ids: HashSet<String>,
    deleted_panel_chat_ids: HashSet<String>,
}

impl LiveSet {
    pub fn from_state(live: &StashedState) -> Self {
        let deleted_message_ids: HashSet<String> = live
            .deleted_chats
            .deleted_message_ids
            .iter()
            .cloned()
            .collect();
        let deleted_panel_chat_ids: HashSet<String> = live
            .deleted_chats
            .deleted_panel_chat_ids
            .iter()
            .cloned()
            .collect();

        let live_chats = live
            .panel_chats
            .iter()
            .filter(|chat| !deleted_panel_chat_ids.contains(&chat.id));
        let mut panel_chat_ids = HashSet::new();
        let mut message_ids = HashSet::new();
        for chat in live_chats {
            panel_chat_ids.insert(chat.id.clone());
            message_ids.extend(
                chat.messages
                    .iter()
                    .filter(|m| !deleted_message_ids.contains(&m.id))
                    .map(|m| m.id.clone()),
            );
        }

        Self {
            message_ids,
            panel_chat_ids,
            inline_chat_ids: live
                .inline_chats
                .iter()
                .map(|c| c.inline_chat_id.clone())
                .collect(),
            deleted_message_ids,
            deleted_panel_chat_ids,
        }
    }

    pub fn is_message_live(&self, message_id: &str) -> bool {
        self.message_ids.contains(message_id) && !self.deleted_message_ids.contains(message_id)
    }

    pub fn is_panel_chat_live(&self, panel_chat_id: &str) -> bool {
        self.panel_chat_ids.contains(panel_chat_id)
    }

    pub fn is_panel_chat_deleted(&self, panel_chat_id: &str) -> bool {
        self.deleted_panel_chat_ids.contains(panel_chat_id)
    }

    pub fn is_inline_chat_live(&self, inline_chat_id: &str) -> bool {
        self.inline_chat_ids.contains(inline_chat_id)
    }
}

/// Entities first introduced by one commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitData {
    pub commit: CommitInfo,
    /// Panel chats holding only the messages this commit introduced
    pub panel_chats: Vec<PanelChat>,
    pub inline_chats: Vec<InlineChat>,
}

impl CommitData {
    pub fn is_empty(&self) -> bool {
        self.panel_chats.iter().all(|c| c.messages.is_empty()) && self.inline_chats.is_empty()
    }

    pub fn message_ids(&self) -> impl Iterator<Item = &str> {
        self.panel_chats
            .iter()
            .flat_map(|c| c.messages.iter().map(|m| m.id.as_str()))
    }
}

/// Live entities not attributed to any commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingChanges {
    pub panel_chats: Vec<PanelChat>,
    pub inline_chats: Vec<InlineChat>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.panel_chats.is_empty() && self.inline_chats.is_empty()
    }

    pub fn message_ids(&self) -> impl Iterator<Item = &str> {
        self.panel_chats
            .iter()
            .flat_map(|c| c.messages.iter().map(|m| m.id.as_str()))
    }
}

/// Result of a history walk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attribution {
    /// Commits with at least one attributed entity, oldest first
    pub commits: Vec<CommitData>,
    /// Live entities present in the index but in no commit
    pub added: PendingChanges,
    /// Live entities in neither a commit nor the index
    pub uncommitted: PendingChanges,
}

impl Attribution {
    pub fn newest_first(&self) -> impl Iterator<Item = &CommitData> {
        self.commits.iter().rev()
    }
}

/// Keeps the items whose key is live and not seen yet, marking them seen.
fn take_first_seen<'a, T, K, L>(
    items: impl IntoIterator<Item = &'a T>,
    key: K,
    is_live: L,
    seen: &mut HashSet<String>,
) -> Vec<T>
where
    T: Clone + 'a,
    K: Fn(&T) -> &str,
    L: Fn(&str) -> bool,
{
    let mut taken = Vec::new();
    for item in items {
        let id = key(item);
        if is_live(id) && seen.insert(id.to_string()) {
            taken.push(item.clone());
        }
    }
    taken
}

/// Keeps the items whose key is live and was never attributed.
fn take_pending<'a, T, K, L>(
    items: impl IntoIterator<Item = &'a T>,
    key: K,
    is_live: L,
    seen: &HashSet<String>,
) -> Vec<T>
where
    T: Clone + 'a,
    K: Fn(&T) -> &str,
    L: Fn(&str) -> bool,
{
    items
        .into_iter()
        .filter(|item| {
            let id = key(*item);
            is_live(id) && !seen.contains(id)
        })
        .cloned()
        .collect()
}

fn message_id(m: &Message) -> &str {
    &m.id
}

fn inline_chat_id(c: &InlineChat) -> &str {
    &c.inline_chat_id
}

struct Walk<'a> {
    live: &'a LiveSet,
    options: WalkOptions,
    seen_messages: HashSet<String>,
    seen_inline_chats: HashSet<String>,
}

impl<'a> Walk<'a> {
    fn commit(&mut self, snapshot: &HistoricalSnapshot) -> CommitData {
        let mut panel_chats = Vec::new();
        if self.options.panel_chats {
            for chat in &snapshot.state.panel_chats {
                if self.live.is_panel_chat_deleted(&chat.id) {
                    continue;
                }
                let live = self.live;
                let messages = take_first_seen(
                    &chat.messages,
                    message_id,
                    |id| live.is_message_live(id),
                    &mut self.seen_messages,
                );
                if !messages.is_empty() {
                    panel_chats.push(PanelChat {
                        messages,
                        ..chat.clone()
                    });
                }
            }
        }

        let inline_chats = if self.options.inline_chats {
            let live = self.live;
            take_first_seen(
                &snapshot.state.inline_chats,
                inline_chat_id,
                |id| live.is_inline_chat_live(id),
                &mut self.seen_inline_chats,
            )
        } else {
            Vec::new()
        };

        CommitData {
            commit: snapshot.commit.clone(),
            panel_chats,
            inline_chats,
        }
    }

    /// Splits every live, unattributed entity into the staged and unstaged buckets.
    fn pending(&self, current: &StashedState, staged: Option<&StashedState>) -> (PendingChanges, PendingChanges) {
        let live = self.live;
        let staged_sets = staged.map(|s| {
            let messages: HashSet<&str> = s
                .panel_chats
                .iter()
                .flat_map(|c| c.messages.iter().map(|m| m.id.as_str()))
                .collect();
            let inline: HashSet<&str> = s.inline_chats.iter().map(|c| c.inline_chat_id.as_str()).collect();
            (messages, inline)
        });
        let is_staged_message = |id: &str| staged_sets.as_ref().is_some_and(|(m, _)| m.contains(id));
        let is_staged_inline = |id: &str| staged_sets.as_ref().is_some_and(|(_, i)| i.contains(id));

        let mut added = PendingChanges::default();
        let mut uncommitted = PendingChanges::default();

        if self.options.panel_chats {
            for chat in &current.panel_chats {
                if !live.is_panel_chat_live(&chat.id) {
                    continue;
                }
                let pending = take_pending(
                    &chat.messages,
                    message_id,
                    |id| live.is_message_live(id),
                    &self.seen_messages,
                );
                let (in_index, outside): (Vec<_>, Vec<_>) =
                    pending.into_iter().partition(|m| is_staged_message(&m.id));
                if !in_index.is_empty() {
                    added.panel_chats.push(PanelChat {
                        messages: in_index,
                        ..chat.clone()
                    });
                }
                if !outside.is_empty() {
                    uncommitted.panel_chats.push(PanelChat {
                        messages: outside,
                        ..chat.clone()
                    });
                }
            }
        }

        if self.options.inline_chats {
            let pending = take_pending(
                &current.inline_chats,
                inline_chat_id,
                |id| live.is_inline_chat_live(id),
                &self.seen_inline_chats,
            );
            let (in_index, outside): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|c| is_staged_inline(&c.inline_chat_id));
            added.inline_chats = in_index;
            uncommitted.inline_chats = outside;
        }

        (added, uncommitted)
    }
}

/// Attributes every live entity of `current` to the first snapshot that
/// contains it.
///
/// `history` must be ordered oldest first and hold only snapshots that passed
/// validation. Tombstones are taken from `current` only. Commits that end up
/// with nothing attributed are dropped. `staged` is the state file as found in
/// the index; without it every unattributed entity is reported uncommitted.
pub fn attribute(
    current: &StashedState,
    history: &[HistoricalSnapshot],
    staged: Option<&StashedState>,
    options: WalkOptions,
) -> Attribution {
    let live = LiveSet::from_state(current);
    let mut walk = Walk {
        live: &live,
        options,
        seen_messages: HashSet::new(),
        seen_inline_chats: HashSet::new(),
    };

    let commits: Vec<CommitData> = history
        .iter()
        .map(|snapshot| walk.commit(snapshot))
        .filter(|data| {
            if data.is_empty() {
                tracing::debug!("Commit {} introduces no live entities", data.commit.short_hash());
                false
            } else {
                true
            }
        })
        .collect();

    let (added, uncommitted) = walk.pending(current, staged);
    Attribution {
        commits,
        added,
        uncommitted,
    }
}
