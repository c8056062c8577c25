//! Git-history attribution.
//!
//! Works out which commit first introduced each conversation entity that is
//! still live today. The walk itself is pure: callers fetch and validate the
//! per-commit snapshots and pass them in oldest first.

pub mod index;
pub mod walker;

pub use index::{AttributionIndex, Origin};
pub use walker::{
    Attribution, CommitData, HistoricalSnapshot, LiveSet, PendingChanges, WalkOptions, attribute,
};
