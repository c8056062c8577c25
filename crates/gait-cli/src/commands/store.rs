use std::path::Path;

use anyhow::{Context, Result};
use gait_application::export::export_panel_chat;
use gait_core::state::StateRepository;
use gait_infrastructure::config_service::save_config;

use super::Workspace;

pub async fn init(root: &Path) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    if !tokio::fs::try_exists(workspace.paths.config_file()).await.unwrap_or(false) {
        save_config(&workspace.paths, &workspace.config).await?;
        println!("Created {}", workspace.paths.config_file().display());
    }
    if workspace.repository.initialize().await? {
        println!("Created {}", workspace.repository.path().display());
    } else {
        println!("State file already present at {}", workspace.repository.path().display());
    }
    Ok(())
}

pub async fn delete_message(root: &Path, id: &str) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    if workspace.repository.tombstone_message(id).await? {
        println!("Deleted message {}", id);
    } else {
        println!("Message {} was already deleted", id);
    }
    Ok(())
}

pub async fn delete_chat(root: &Path, id: &str) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    if workspace.repository.tombstone_panel_chat(id).await? {
        println!("Deleted conversation {}", id);
    } else {
        println!("Conversation {} was already deleted", id);
    }
    Ok(())
}

pub async fn export(root: &Path, chat_id: &str, output: Option<&Path>) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    let state = workspace.repository.read().await?;
    let markdown = export_panel_chat(&state, chat_id)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, markdown)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported conversation {} to {}", chat_id, path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
