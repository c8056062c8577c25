//! Low-level file storage.
//!
//! - `atomic_file`: whole-file replacement via temp file and rename
//! - `codec`: transparent gzip encoding of the state document

pub mod atomic_file;
pub mod codec;
