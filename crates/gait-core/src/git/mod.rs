//! Git history access.
//!
//! The walker and the merge tooling only need a handful of read queries, so
//! the core defines them as a trait and leaves the subprocess plumbing to the
//! infrastructure layer.

pub mod log;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use log::{LOG_FORMAT, parse_log};

/// One commit that touched a tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    /// Author date as printed by git (ISO 8601 strict)
    pub date: String,
    /// Subject line of the commit message
    pub message: String,
    /// Path of the file as of this commit. Differs across a rename.
    pub path: String,
}

impl CommitInfo {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

/// Read access to the workspace repository.
#[async_trait]
pub trait GitHistory: Send + Sync {
    /// Whether the workspace is inside a Git work tree.
    async fn is_repository(&self) -> Result<bool>;

    /// Commits that touched `path`, oldest first, following renames.
    async fn file_history(&self, path: &str) -> Result<Vec<CommitInfo>>;

    /// Contents of `path` as of `commit`.
    async fn show_file_at(&self, commit: &str, path: &str) -> Result<Vec<u8>>;

    /// Contents of `path` in the index, or `None` when it is not staged.
    async fn show_staged_file(&self, path: &str) -> Result<Option<Vec<u8>>>;
}
