//! Core domain for gait.
//!
//! Holds the persisted conversation model and every pure algorithm that works
//! on it: schema validation and healing, content matching, history
//! attribution and the union merge. I/O is reached only through the
//! [`state::StateRepository`], [`reader::SessionReader`] and
//! [`git::GitHistory`] traits.

pub mod attribution;
pub mod config;
pub mod error;
pub mod git;
pub mod kv;
pub mod matching;
pub mod merge;
pub mod reader;
pub mod sanitize;
pub mod state;

pub use error::GaitError;
