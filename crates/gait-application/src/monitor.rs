//! Reconciliation monitor.
//!
//! Periodically pulls the editor's live conversations through a
//! [`SessionReader`] and folds them into the persisted state. Ticks are
//! single-flight: a tick that starts while another one is running is skipped,
//! never queued.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gait_core::config::{GaitConfig, StashPolicy};
use gait_core::error::{GaitError, Result};
use gait_core::matching::{ExactMatchOptions, code_block_lines, document_lines, match_exact};
use gait_core::reader::SessionReader;
use gait_core::sanitize::Sanitizer;
use gait_core::state::{Message, PanelChat, StashedState, StateRepository};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Messages appended to chats that were already stored
    pub appended_messages: usize,
    /// Chats stored for the first time
    pub created_chats: usize,
    /// Chats held in the staging area after this pass
    pub staged_chats: usize,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running
    Skipped,
    Completed(ReconcileReport),
    Failed(String),
}

#[derive(Debug, Default)]
struct MonitorCounters {
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    appended_messages: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub ticks_completed: u64,
    pub ticks_skipped: u64,
    pub ticks_failed: u64,
    pub messages_appended: u64,
}

/// Clears the in-flight flag when a tick ends, including on early return.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReconciliationMonitor {
    reader: Arc<dyn SessionReader>,
    repository: Arc<dyn StateRepository>,
    policy: StashPolicy,
    sanitizer: Sanitizer,
    exact_options: ExactMatchOptions,
    in_flight: Arc<AtomicBool>,
    staged: Arc<RwLock<Vec<PanelChat>>>,
    counters: MonitorCounters,
}

impl ReconciliationMonitor {
    pub fn new(
        reader: Arc<dyn SessionReader>,
        repository: Arc<dyn StateRepository>,
        policy: StashPolicy,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            reader,
            repository,
            policy,
            sanitizer,
            exact_options: ExactMatchOptions::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
            staged: Arc::new(RwLock::new(Vec::new())),
            counters: MonitorCounters::default(),
        }
    }

    /// Builds a monitor from the workspace configuration.
    pub fn from_config(
        reader: Arc<dyn SessionReader>,
        repository: Arc<dyn StateRepository>,
        config: &GaitConfig,
    ) -> Result<Self> {
        let sanitizer = Sanitizer::with_patterns(&config.sanitize_patterns)?;
        let mut monitor = Self::new(reader, repository, config.stash_policy, sanitizer);
        monitor.exact_options = config.exact_options();
        Ok(monitor)
    }

    pub fn policy(&self) -> StashPolicy {
        self.policy
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            ticks_completed: self.counters.completed.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
            ticks_failed: self.counters.failed.load(Ordering::Relaxed),
            messages_appended: self.counters.appended_messages.load(Ordering::Relaxed),
        }
    }

    /// Chats observed but not stored yet (`OnlyMatchedChats` only).
    pub async fn staged_chats(&self) -> Vec<PanelChat> {
        self.staged.read().await.clone()
    }

    /// Runs one reconciliation pass unless one is already running.
    ///
    /// Errors never escape: a failed pass is logged and reported as
    /// [`TickOutcome::Failed`] so a periodic caller simply tries again later.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("[ReconciliationMonitor] Previous tick still running, skipping");
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return TickOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.reconcile().await {
            Ok(report) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .appended_messages
                    .fetch_add(report.appended_messages as u64, Ordering::Relaxed);
                if report.persisted {
                    tracing::info!(
                        "[ReconciliationMonitor] Stored {} new messages, {} new chats",
                        report.appended_messages,
                        report.created_chats
                    );
                }
                TickOutcome::Completed(report)
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                match &e {
                    GaitError::Reader(_) => {
                        tracing::warn!("[ReconciliationMonitor] Session reader failed, skipping tick: {}", e)
                    }
                    _ => tracing::error!("[ReconciliationMonitor] Tick failed: {}", e),
                }
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut observed = self.reader.parse_panel_chats().await?;
        for chat in &mut observed {
            self.sanitizer.clean_panel_chat(chat);
        }

        let mut state = self.repository.read().await?;
        let mut report = ReconcileReport::default();
        let mut unmatched = Vec::new();

        for chat in observed {
            if state.is_panel_chat_deleted(&chat.id) {
                continue;
            }
            let incoming: Vec<_> = chat
                .messages
                .iter()
                .filter(|m| !state.is_message_deleted(&m.id))
                .cloned()
                .collect();

            if let Some(stored) = state.find_panel_chat_mut(&chat.id) {
                report.appended_messages += stored.append_new_messages(&incoming);
                continue;
            }
            match self.policy {
                StashPolicy::AddAllChats => {
                    let messages = dedup_by_id(incoming);
                    report.appended_messages += messages.len();
                    report.created_chats += 1;
                    state.panel_chats.push(PanelChat { messages, ..chat });
                }
                StashPolicy::OnlyMatchedChats => unmatched.push(chat),
            }
        }

        report.staged_chats = unmatched.len();
        *self.staged.write().await = unmatched;

        if report.appended_messages > 0 || report.created_chats > 0 {
            self.repository.write(&state).await?;
            report.persisted = true;
        }
        Ok(report)
    }

    /// Moves the staged chat `panel_chat_id` into the store.
    ///
    /// Returns the number of messages that were added.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotFound`] when no such chat is staged.
    pub async fn promote(&self, panel_chat_id: &str) -> Result<usize> {
        let chat = {
            let mut staged = self.staged.write().await;
            let position = staged
                .iter()
                .position(|c| c.id == panel_chat_id)
                .ok_or_else(|| GaitError::not_found("StagedPanelChat", panel_chat_id))?;
            staged.remove(position)
        };

        let mut state = self.repository.read().await?;
        let added = store_chat(&mut state, chat);
        self.repository.write(&state).await?;
        tracing::info!(
            "[ReconciliationMonitor] Promoted chat {} ({} messages)",
            panel_chat_id,
            added
        );
        Ok(added)
    }

    /// Promotes every staged chat whose code blocks appear in the document.
    ///
    /// Returns the ids of the promoted chats.
    pub async fn promote_matching(&self, document_text: &str) -> Result<Vec<String>> {
        let lines = document_lines(document_text);
        let matching: Vec<String> = self
            .staged
            .read()
            .await
            .iter()
            .filter(|chat| {
                chat.messages.iter().any(|m| {
                    let code = code_block_lines(&m.response_text);
                    !match_exact(&lines, &code, self.exact_options).is_empty()
                })
            })
            .map(|chat| chat.id.clone())
            .collect();

        for id in &matching {
            self.promote(id).await?;
        }
        Ok(matching)
    }

    /// Starts ticking every `interval` on the current runtime.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let monitor = Arc::clone(self);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!("[ReconciliationMonitor] Started ({:?} interval)", interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.tick().await;
                    }
                }
            }
            tracing::info!("[ReconciliationMonitor] Stopped");
        });

        MonitorHandle { token, join }
    }
}

fn dedup_by_id(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

/// Stores `chat`, appending to an existing chat with the same id.
fn store_chat(state: &mut StashedState, chat: PanelChat) -> usize {
    let incoming: Vec<_> = chat
        .messages
        .iter()
        .filter(|m| !state.is_message_deleted(&m.id))
        .cloned()
        .collect();
    match state.find_panel_chat_mut(&chat.id) {
        Some(stored) => stored.append_new_messages(&incoming),
        None => {
            let messages = dedup_by_id(incoming);
            let added = messages.len();
            state.panel_chats.push(PanelChat { messages, ..chat });
            added
        }
    }
}

/// Owner of a running monitor loop.
///
/// Dropping the handle without calling [`MonitorHandle::shutdown`] leaves the
/// loop running until the runtime shuts down.
pub struct MonitorHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stops the loop. A tick in progress runs to completion first.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            tracing::error!("[ReconciliationMonitor] Loop task ended abnormally: {}", e);
        }
    }
}
