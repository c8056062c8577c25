//! Conflict resolution for the state file.
//!
//! Two entry points: the Git merge driver, which receives the three versions
//! as separate files, and a manual pass over a state file that already holds
//! conflict markers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gait_core::merge::{has_conflict_markers, merge_documents, resolve_conflicted};
use gait_core::state::{StashedState, StateRepository};
use gait_infrastructure::paths::GaitPaths;
use gait_infrastructure::storage::atomic_file::AtomicFile;
use gait_infrastructure::storage::codec;

async fn read_side(path: &Path) -> Result<(String, bool)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let compressed = codec::is_gzip(&bytes);
    let text = codec::decode(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok((text, compressed))
}

/// Merges `base`, `ours` and `theirs` and writes the result over `ours`.
///
/// The output keeps the compression of `ours`. Nothing is written when either
/// side fails validation.
pub async fn run_merge_driver(base: &Path, ours: &Path, theirs: &Path) -> Result<StashedState> {
    let base_text = match read_side(base).await {
        Ok((text, _)) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("[MergeDriver] No usable base version: {:#}", e);
            None
        }
    };
    let (ours_text, compressed) = read_side(ours).await?;
    let (theirs_text, _) = read_side(theirs).await?;

    let merged = merge_documents(base_text.as_deref(), &ours_text, &theirs_text)
        .context("State files cannot be merged")?;

    let json = serde_json::to_string_pretty(&merged)?;
    AtomicFile::new(ours)
        .save(&codec::encode(&json, compressed)?)
        .await
        .with_context(|| format!("Failed to write merged state to {}", ours.display()))?;

    tracing::info!(
        "[MergeDriver] Merged state: {} panel chats, {} inline chats",
        merged.panel_chats.len(),
        merged.inline_chats.len()
    );
    Ok(merged)
}

/// Resolves conflict markers left in the workspace state file.
///
/// Returns `false` when the file holds no markers. The raw file is inspected
/// before the repository gets a chance to heal it away.
pub async fn resolve_conflicts(paths: &GaitPaths, repository: &Arc<dyn StateRepository>) -> Result<bool> {
    let Some(bytes) = AtomicFile::new(paths.state_file()).load().await? else {
        return Ok(false);
    };
    let text = codec::decode(&bytes).context("Failed to decode state file")?;
    if !has_conflict_markers(&text) {
        return Ok(false);
    }

    let merged = resolve_conflicted(&text).context("Conflicted state file cannot be resolved")?;
    repository.write(&merged).await?;
    tracing::info!(
        "[ConflictService] Resolved conflicts in {}",
        paths.state_file().display()
    );
    Ok(true)
}
