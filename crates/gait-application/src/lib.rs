//! Application layer for gait.
//!
//! Use cases that coordinate the domain algorithms in `gait-core` with the
//! file, Git and session adapters in `gait-infrastructure`.

pub mod attribution_service;
pub mod conflict_service;
pub mod decoration_service;
pub mod export;
pub mod inline_recorder;
pub mod monitor;

pub use attribution_service::AttributionService;
pub use decoration_service::{Decoration, DecorationService, DecorationSource};
pub use inline_recorder::InlineChatRecorder;
pub use monitor::{MonitorHandle, ReconcileReport, ReconciliationMonitor, TickOutcome};
