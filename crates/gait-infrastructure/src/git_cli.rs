//! Git subprocess adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gait_core::error::{GaitError, Result};
use gait_core::git::{CommitInfo, GitHistory, LOG_FORMAT, parse_log};
use tokio::process::Command;

/// Default cap on captured stdout for one git invocation.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Runs `git` in a workspace directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    max_output_bytes: usize,
}

/// Captured result of a git invocation that exited.
#[derive(Debug)]
struct GitOutput {
    success: bool,
    stdout: Vec<u8>,
    stderr: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn run(&self, args: &[&str]) -> Result<GitOutput> {
        tracing::debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .output()
            .await
            .map_err(|e| GaitError::git(format!("Failed to execute git: {}", e)))?;

        if output.stdout.len() > self.max_output_bytes {
            return Err(GaitError::git(format!(
                "git {} produced {} bytes, above the {} byte limit",
                args.first().copied().unwrap_or_default(),
                output.stdout.len(),
                self.max_output_bytes
            )));
        }

        Ok(GitOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Runs git and fails on a non-zero exit status.
    async fn run_checked(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.run(args).await?;
        if !output.success {
            return Err(GaitError::git(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr
            )));
        }
        Ok(output.stdout)
    }

    /// Sets a repository-local config value.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.run_checked(&["config", key, value]).await?;
        Ok(())
    }

    /// Reads a repository config value, `None` when unset.
    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let output = self.run(&["config", "--get", key]).await?;
        if !output.success {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }
}

#[async_trait]
impl GitHistory for GitCli {
    async fn is_repository(&self) -> Result<bool> {
        let output = self.run(&["rev-parse", "--is-inside-work-tree"]).await?;
        Ok(output.success && String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    async fn file_history(&self, path: &str) -> Result<Vec<CommitInfo>> {
        if !self.is_repository().await? {
            return Err(GaitError::git(format!(
                "{} is not inside a git repository",
                self.workdir.display()
            )));
        }
        let stdout = self
            .run_checked(&[
                "log",
                "--follow",
                "--name-only",
                "--date=iso-strict",
                LOG_FORMAT,
                "--",
                path,
            ])
            .await?;
        let commits = parse_log(&String::from_utf8_lossy(&stdout), path);
        tracing::debug!("{} commits touch {}", commits.len(), path);
        Ok(commits)
    }

    async fn show_file_at(&self, commit: &str, path: &str) -> Result<Vec<u8>> {
        let spec = format!("{}:{}", commit, path);
        self.run_checked(&["show", &spec]).await
    }

    async fn show_staged_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let spec = format!(":./{}", path);
        let output = self.run(&["show", &spec]).await?;
        if output.success {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }
}
