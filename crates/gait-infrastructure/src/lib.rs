pub mod config_service;
pub mod file_session_reader;
pub mod file_state_repository;
pub mod git_cli;
pub mod merge_driver;
pub mod paths;
pub mod storage;

pub use crate::file_session_reader::FileSessionReader;
pub use crate::file_state_repository::FileStateRepository;
pub use crate::git_cli::GitCli;
pub use crate::paths::GaitPaths;
