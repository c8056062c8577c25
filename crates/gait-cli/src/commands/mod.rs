pub mod history;
pub mod merge;
pub mod store;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use gait_core::config::GaitConfig;
use gait_core::state::StateRepository;
use gait_infrastructure::config_service::load_workspace;
use gait_infrastructure::{FileStateRepository, GaitPaths};

/// Resolved workspace: paths, configuration and the state store.
pub struct Workspace {
    pub paths: GaitPaths,
    pub config: GaitConfig,
    pub repository: Arc<FileStateRepository>,
}

impl Workspace {
    pub async fn open(root: &Path) -> Result<Self> {
        let (paths, config) = load_workspace(GaitPaths::new(root))
            .await
            .with_context(|| format!("Failed to load configuration in {}", root.display()))?;
        let repository = Arc::new(FileStateRepository::new(&paths, config.compress_state));
        Ok(Self {
            paths,
            config,
            repository,
        })
    }

    pub fn store(&self) -> Arc<dyn StateRepository> {
        self.repository.clone()
    }
}
