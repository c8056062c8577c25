//! Document decorations.
//!
//! Finds the regions of a document that came from a stored conversation:
//! panel chat code blocks through the exact-set matcher, inline chat diffs
//! through the fuzzy matcher. Matched messages can be tagged with the document
//! path so later lookups do not need to rescan every chat.

use std::sync::Arc;

use gait_core::attribution::{AttributionIndex, Origin};
use gait_core::config::GaitConfig;
use gait_core::error::Result;
use gait_core::kv;
use gait_core::matching::{LineRange, code_block_lines, document_lines, match_exact, match_fuzzy};
use gait_core::state::StateRepository;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DecorationSource {
    PanelChat {
        panel_chat_id: String,
        message_id: String,
    },
    InlineChat {
        inline_chat_id: String,
    },
}

impl DecorationSource {
    fn origin_in<'a>(&self, index: &'a AttributionIndex) -> Option<&'a Origin> {
        match self {
            Self::PanelChat { message_id, .. } => index.message(message_id),
            Self::InlineChat { inline_chat_id } => index.inline_chat(inline_chat_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoration {
    pub range: LineRange,
    pub source: DecorationSource,
    /// Prompt that produced the region
    pub prompt: String,
    /// Block similarity for fuzzy matches, `None` for exact ones
    pub similarity: Option<f64>,
    pub origin: Option<Origin>,
}

impl Decoration {
    /// Hover text: prompt first line plus attribution when known.
    pub fn hover_text(&self) -> String {
        let prompt = self.prompt.lines().next().unwrap_or_default();
        match &self.origin {
            Some(origin) => format!("{} ({})", prompt, origin.label()),
            None => prompt.to_string(),
        }
    }
}

pub struct DecorationService {
    repository: Arc<dyn StateRepository>,
    config: GaitConfig,
}

impl DecorationService {
    pub fn new(repository: Arc<dyn StateRepository>, config: GaitConfig) -> Self {
        Self { repository, config }
    }

    /// Computes decorations for `document_text` located at `document_path`.
    ///
    /// Tombstoned chats and messages are ignored. When file associations are
    /// enabled, every matched message gets `document_path` recorded in its
    /// `kv_store` and the state is written back if that changed anything.
    pub async fn decorate(&self, document_path: &str, document_text: &str) -> Result<Vec<Decoration>> {
        let mut state = self.repository.read().await?;
        let lines = document_lines(document_text);
        let exact_options = self.config.exact_options();
        let fuzzy_options = self.config.fuzzy_options();

        let mut decorations = Vec::new();
        let mut matched_messages: Vec<(String, String)> = Vec::new();

        for chat in state.visible_panel_chats() {
            for message in &chat.messages {
                let code = code_block_lines(&message.response_text);
                if code.is_empty() {
                    continue;
                }
                let ranges = match_exact(&lines, &code, exact_options);
                if ranges.is_empty() {
                    continue;
                }
                matched_messages.push((chat.id.clone(), message.id.clone()));
                decorations.extend(ranges.into_iter().map(|range| Decoration {
                    range,
                    source: DecorationSource::PanelChat {
                        panel_chat_id: chat.id.clone(),
                        message_id: message.id.clone(),
                    },
                    prompt: message.message_text.clone(),
                    similarity: None,
                    origin: None,
                }));
            }
        }

        for inline in state.inline_chats.iter().filter(|c| c.touches_file(document_path)) {
            let added = inline.added_lines_for(document_path);
            for found in match_fuzzy(&lines, &added, fuzzy_options) {
                decorations.push(Decoration {
                    range: found.range,
                    source: DecorationSource::InlineChat {
                        inline_chat_id: inline.inline_chat_id.clone(),
                    },
                    prompt: inline.prompt.clone(),
                    similarity: Some(found.similarity),
                    origin: None,
                });
            }
        }

        if self.config.record_file_associations && !matched_messages.is_empty() {
            let mut changed = false;
            for (chat_id, message_id) in &matched_messages {
                let message = state
                    .find_panel_chat_mut(chat_id)
                    .and_then(|chat| chat.messages.iter_mut().find(|m| &m.id == message_id));
                if let Some(message) = message {
                    changed |= kv::add_file_path(&mut message.kv_store, document_path);
                }
            }
            if changed {
                self.repository.write(&state).await?;
                tracing::debug!(
                    "[DecorationService] Recorded {} for {} messages",
                    document_path,
                    matched_messages.len()
                );
            }
        }

        decorations.sort_by_key(|d| d.range);
        Ok(decorations)
    }

    /// Attaches attribution origins to `decorations`.
    pub fn annotate(decorations: &mut [Decoration], index: &AttributionIndex) {
        for decoration in decorations {
            decoration.origin = decoration.source.origin_in(index).cloned();
        }
    }
}
