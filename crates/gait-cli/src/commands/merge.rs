use std::path::Path;

use anyhow::{Context, Result};
use gait_application::conflict_service::{resolve_conflicts, run_merge_driver};
use gait_infrastructure::GitCli;
use gait_infrastructure::merge_driver;

use super::Workspace;

pub async fn resolve(root: &Path) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    if resolve_conflicts(&workspace.paths, &workspace.store()).await? {
        println!("Resolved conflicts in {}", workspace.paths.state_file().display());
    } else {
        println!("No conflicts found in {}", workspace.paths.state_file().display());
    }
    Ok(())
}

/// Runs as the Git merge driver; an error exits non-zero so Git reports a
/// regular conflict.
pub async fn merge_driver(base: &Path, ours: &Path, theirs: &Path) -> Result<()> {
    run_merge_driver(base, ours, theirs).await?;
    Ok(())
}

pub async fn install(root: &Path) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    let git = GitCli::new(workspace.paths.workspace_root());
    let binary = std::env::current_exe()
        .context("Failed to locate the gait executable")?
        .to_string_lossy()
        .into_owned();

    let report = merge_driver::install(&workspace.paths, &git, &binary).await?;
    if report == merge_driver::InstallReport::default() {
        println!("Merge driver already installed");
    } else {
        println!("Installed merge driver for {}", merge_driver::attributes_line(&workspace.paths));
    }
    Ok(())
}
