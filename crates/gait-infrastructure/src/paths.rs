//! Workspace path layout.
//!
//! ```text
//! <workspace>/
//! ├── .gitattributes          # merge driver registration for the state file
//! └── .gait/
//!     ├── config.toml         # GaitConfig
//!     ├── stashed_state.json  # persisted conversations (name configurable)
//!     └── merge-driver.sh     # script git invokes for the state file
//! ```

use std::path::{Path, PathBuf};

pub const GAIT_DIR: &str = ".gait";
pub const CONFIG_FILE: &str = "config.toml";
pub const MERGE_DRIVER_SCRIPT: &str = "merge-driver.sh";
pub const GITATTRIBUTES: &str = ".gitattributes";
pub const DEFAULT_STATE_FILE: &str = "stashed_state.json";

/// Resolves every path gait touches inside one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaitPaths {
    workspace_root: PathBuf,
    state_file_name: String,
}

impl GaitPaths {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            state_file_name: DEFAULT_STATE_FILE.to_string(),
        }
    }

    /// Uses `name` (a plain file name inside `.gait/`) for the state file.
    pub fn with_state_file(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn gait_dir(&self) -> PathBuf {
        self.workspace_root.join(GAIT_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.gait_dir().join(CONFIG_FILE)
    }

    pub fn state_file(&self) -> PathBuf {
        self.gait_dir().join(&self.state_file_name)
    }

    /// State file path relative to the workspace root, with `/` separators,
    /// as git expects it in pathspecs and `<rev>:<path>` lookups.
    pub fn state_file_relative(&self) -> String {
        format!("{}/{}", GAIT_DIR, self.state_file_name)
    }

    pub fn merge_driver_script(&self) -> PathBuf {
        self.gait_dir().join(MERGE_DRIVER_SCRIPT)
    }

    pub fn gitattributes(&self) -> PathBuf {
        self.workspace_root.join(GITATTRIBUTES)
    }
}
