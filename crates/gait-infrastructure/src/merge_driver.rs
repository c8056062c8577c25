//! Git merge driver installation.
//!
//! Git calls the driver with `%O %A %B` (base, ours, theirs). The driver must
//! leave the merged document in the `%A` file and exit zero, or exit non-zero
//! to fall back to a regular conflict.

use gait_core::error::Result;

use crate::git_cli::GitCli;
use crate::paths::GaitPaths;
use crate::storage::atomic_file::AtomicFile;

pub const DRIVER_NAME: &str = "gait";
const DRIVER_DESCRIPTION: &str = "gait stashed state union merge";

/// What [`install`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub script_written: bool,
    pub config_updated: bool,
    pub attributes_updated: bool,
}

fn script(binary: &str) -> String {
    format!(
        "#!/bin/sh\n\
         # Installed by `gait install-merge-driver`.\n\
         # Usage: merge-driver.sh <base> <ours> <theirs>\n\
         exec \"{}\" merge-driver \"$1\" \"$2\" \"$3\"\n",
        binary
    )
}

/// `.gitattributes` line routing the state file through the driver.
pub fn attributes_line(paths: &GaitPaths) -> String {
    format!("{} merge={}", paths.state_file_relative(), DRIVER_NAME)
}

/// Writes the driver script, registers it in the repository config and adds
/// the `.gitattributes` entry. Existing matching entries are left untouched.
pub async fn install(paths: &GaitPaths, git: &GitCli, binary: &str) -> Result<InstallReport> {
    let mut report = InstallReport::default();

    let script_file = AtomicFile::new(paths.merge_driver_script());
    let content = script(binary);
    if script_file.load().await?.as_deref() != Some(content.as_bytes()) {
        script_file.save(content.as_bytes()).await?;
        report.script_written = true;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(
            paths.merge_driver_script(),
            std::fs::Permissions::from_mode(0o755),
        )
        .await?;
    }

    let driver_command = format!("sh {}/{} %O %A %B", crate::paths::GAIT_DIR, crate::paths::MERGE_DRIVER_SCRIPT);
    let name_key = format!("merge.{}.name", DRIVER_NAME);
    let driver_key = format!("merge.{}.driver", DRIVER_NAME);
    if git.get_config(&driver_key).await?.as_deref() != Some(driver_command.as_str()) {
        git.set_config(&name_key, DRIVER_DESCRIPTION).await?;
        git.set_config(&driver_key, &driver_command).await?;
        report.config_updated = true;
    }

    report.attributes_updated = add_attributes_line(paths).await?;
    tracing::info!("Merge driver installed: {:?}", report);
    Ok(report)
}

async fn add_attributes_line(paths: &GaitPaths) -> Result<bool> {
    let file = AtomicFile::new(paths.gitattributes());
    let existing = file
        .load()
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    let line = attributes_line(paths);
    if existing.lines().any(|l| l.trim() == line) {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&line);
    updated.push('\n');
    file.save(updated.as_bytes()).await?;
    Ok(true)
}
