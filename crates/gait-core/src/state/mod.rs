//! Stashed state domain module.
//!
//! - `model`: persisted document types (`StashedState`, `PanelChat`, `Message`, ...)
//! - `schema`: structural validation and field-level self-healing
//! - `repository`: persistence trait with read-modify-write helpers

pub mod model;
pub mod repository;
pub mod schema;

pub use model::{
    Context, DeletedChats, FileDiff, InlineChat, InlineSelection, LineChange, Message, PanelChat,
    Position, StashedState, UpsertOutcome,
};
pub use repository::StateRepository;
pub use schema::HealReport;
