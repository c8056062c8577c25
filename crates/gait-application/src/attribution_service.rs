//! Attribution use case: fetch history snapshots and run the walk.

use std::sync::Arc;

use gait_core::attribution::{
    Attribution, AttributionIndex, HistoricalSnapshot, WalkOptions, attribute,
};
use gait_core::error::{GaitError, Result};
use gait_core::git::{CommitInfo, GitHistory};
use gait_core::state::schema;
use gait_core::state::{StashedState, StateRepository};
use gait_infrastructure::paths::GaitPaths;
use gait_infrastructure::storage::codec;

pub struct AttributionService {
    repository: Arc<dyn StateRepository>,
    git: Arc<dyn GitHistory>,
    paths: GaitPaths,
}

fn parse_snapshot(bytes: &[u8]) -> Result<StashedState> {
    schema::parse_strict(&codec::decode(bytes)?)
}

impl AttributionService {
    pub fn new(
        repository: Arc<dyn StateRepository>,
        git: Arc<dyn GitHistory>,
        paths: GaitPaths,
    ) -> Self {
        Self {
            repository,
            git,
            paths,
        }
    }

    /// Attributes every live entity to the commit that first introduced it.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotFound`] when the state file does not exist and
    /// [`GaitError::Git`] when the history cannot be listed. Individual commits
    /// that cannot be read or validated are skipped.
    pub async fn attribute(&self, options: WalkOptions) -> Result<Attribution> {
        let state_file = self.paths.state_file();
        if !tokio::fs::try_exists(&state_file).await.unwrap_or(false) {
            return Err(GaitError::not_found(
                "StateFile",
                state_file.display().to_string(),
            ));
        }

        let current = self.repository.read().await?;
        let relative = self.paths.state_file_relative();
        let commits = self.git.file_history(&relative).await?;
        let history = self.snapshots(commits).await;
        let staged = self.staged_snapshot(&relative).await;

        let attribution = attribute(&current, &history, staged.as_ref(), options);
        tracing::debug!(
            "[AttributionService] {} of {} commits carry live entities",
            attribution.commits.len(),
            history.len()
        );
        Ok(attribution)
    }

    /// Runs [`Self::attribute`] and indexes the result by entity id.
    pub async fn index(&self, options: WalkOptions) -> Result<AttributionIndex> {
        let attribution = self.attribute(options).await?;
        Ok(AttributionIndex::build(&attribution))
    }

    async fn snapshots(&self, commits: Vec<CommitInfo>) -> Vec<HistoricalSnapshot> {
        let mut history = Vec::with_capacity(commits.len());
        for commit in commits {
            let parsed = match self.git.show_file_at(&commit.hash, &commit.path).await {
                Ok(bytes) => parse_snapshot(&bytes),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(state) => history.push(HistoricalSnapshot { commit, state }),
                Err(e) => tracing::warn!(
                    "[AttributionService] Skipping commit {}: {}",
                    commit.short_hash(),
                    e
                ),
            }
        }
        history
    }

    async fn staged_snapshot(&self, relative: &str) -> Option<StashedState> {
        match self.git.show_staged_file(relative).await {
            Ok(Some(bytes)) => match parse_snapshot(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!("[AttributionService] Ignoring unreadable staged state: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[AttributionService] Could not read index: {}", e);
                None
            }
        }
    }
}
