use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use gait_application::{ReconciliationMonitor, TickOutcome};
use gait_infrastructure::FileSessionReader;

use super::Workspace;

pub async fn watch(root: &Path, source: &Path, ticks: Option<u64>) -> Result<()> {
    let workspace = Workspace::open(root).await?;
    let reader = Arc::new(FileSessionReader::new(source));
    let monitor = Arc::new(ReconciliationMonitor::from_config(
        reader,
        workspace.store(),
        &workspace.config,
    )?);
    let interval = workspace.config.monitor_interval();

    if let Some(count) = ticks {
        for tick in 0..count {
            if tick > 0 {
                tokio::time::sleep(interval).await;
            }
            if let TickOutcome::Completed(report) = monitor.tick().await {
                println!("{}", serde_json::to_string(&report)?);
            }
        }
        return Ok(());
    }

    let handle = monitor.spawn(interval);
    println!("Watching {} every {:?}, press Ctrl-C to stop", source.display(), interval);
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    println!("{}", serde_json::to_string(&monitor.stats())?);
    Ok(())
}
