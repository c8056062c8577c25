use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gait_application::{AttributionService, DecorationService};
use gait_core::attribution::{PendingChanges, WalkOptions};
use gait_core::state::PanelChat;
use gait_infrastructure::GitCli;

use super::Workspace;

fn attribution_service(workspace: &Workspace) -> AttributionService {
    let git = GitCli::new(workspace.paths.workspace_root());
    AttributionService::new(workspace.store(), Arc::new(git), workspace.paths.clone())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn print_panel_chats(chats: &[PanelChat]) {
    for chat in chats {
        for message in &chat.messages {
            println!("    {} [{}] {}", message.id, chat.id, first_line(&message.message_text));
        }
    }
}

fn print_pending(title: &str, pending: &PendingChanges) {
    if pending.is_empty() {
        return;
    }
    println!("{}", title);
    print_panel_chats(&pending.panel_chats);
    for inline in &pending.inline_chats {
        println!("    {} [inline] {}", inline.inline_chat_id, first_line(&inline.prompt));
    }
}

pub async fn history(root: &Path) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    let attribution = attribution_service(&workspace)
        .attribute(WalkOptions::default())
        .await
        .context("Failed to walk the state file history")?;

    print_pending("Not committed:", &attribution.uncommitted);
    print_pending("Staged:", &attribution.added);
    for data in attribution.newest_first() {
        println!(
            "{} {} ({}, {})",
            data.commit.short_hash(),
            data.commit.message,
            data.commit.author,
            data.commit.date
        );
        print_panel_chats(&data.panel_chats);
        for inline in &data.inline_chats {
            println!("    {} [inline] {}", inline.inline_chat_id, first_line(&inline.prompt));
        }
    }
    Ok(())
}

pub async fn blame(root: &Path, file: &Path) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    let full_path = workspace.paths.workspace_root().join(file);
    let text = tokio::fs::read_to_string(&full_path)
        .await
        .with_context(|| format!("Failed to read {}", full_path.display()))?;

    let document_path = file.to_string_lossy().replace('\\', "/");
    let document_path = document_path.trim_start_matches("./");
    let service = DecorationService::new(workspace.store(), workspace.config.clone());
    let mut decorations = service.decorate(document_path, &text).await?;
    if decorations.is_empty() {
        println!("No stored conversation matches {}", document_path);
        return Ok(());
    }

    match attribution_service(&workspace).index(WalkOptions::default()).await {
        Ok(index) => DecorationService::annotate(&mut decorations, &index),
        Err(e) => tracing::warn!("History unavailable, showing matches only: {:#}", e),
    }

    for decoration in &decorations {
        let similarity = decoration
            .similarity
            .map(|s| format!(" ~{:.0}%", s * 100.0))
            .unwrap_or_default();
        println!(
            "{:>5}-{:<5}{} {}",
            decoration.range.start_line + 1,
            decoration.range.end_line + 1,
            similarity,
            decoration.hover_text()
        );
    }
    Ok(())
}
