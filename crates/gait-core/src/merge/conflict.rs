//! Resolution of a state file left with Git conflict markers.

use crate::error::{GaitError, Result};
use crate::state::StashedState;

const OURS_MARKER: &str = "<<<<<<<";
const BASE_MARKER: &str = "|||||||";
const SEPARATOR: &str = "=======";
const THEIRS_MARKER: &str = ">>>>>>>";

/// The two documents reconstructed from a conflicted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSides {
    pub ours: String,
    pub theirs: String,
}

enum Section {
    Common,
    Ours,
    Base,
    Theirs,
}

pub fn has_conflict_markers(text: &str) -> bool {
    text.lines().any(|line| line.starts_with(OURS_MARKER))
}

/// Splits a conflicted file into its two sides.
///
/// Lines outside conflict blocks go to both sides. A diff3 base section is
/// dropped. Returns `None` when the text has no conflict block.
///
/// # Errors
///
/// Returns [`GaitError::Merge`] for unbalanced markers.
pub fn split_conflict_markers(text: &str) -> Result<Option<ConflictSides>> {
    if !has_conflict_markers(text) {
        return Ok(None);
    }

    let mut ours = String::with_capacity(text.len());
    let mut theirs = String::with_capacity(text.len());
    let mut section = Section::Common;

    for (number, line) in text.lines().enumerate() {
        let unexpected = || GaitError::merge(format!("unexpected conflict marker on line {}", number + 1));
        if line.starts_with(OURS_MARKER) {
            match section {
                Section::Common => section = Section::Ours,
                _ => return Err(unexpected()),
            }
        } else if line.starts_with(BASE_MARKER) {
            match section {
                Section::Ours => section = Section::Base,
                _ => return Err(unexpected()),
            }
        } else if line.starts_with(SEPARATOR) && !matches!(section, Section::Common | Section::Theirs) {
            section = Section::Theirs;
        } else if line.starts_with(THEIRS_MARKER) {
            match section {
                Section::Theirs => section = Section::Common,
                _ => return Err(unexpected()),
            }
        } else {
            match section {
                Section::Common => {
                    push_line(&mut ours, line);
                    push_line(&mut theirs, line);
                }
                Section::Ours => push_line(&mut ours, line),
                Section::Theirs => push_line(&mut theirs, line),
                Section::Base => {}
            }
        }
    }

    if !matches!(section, Section::Common) {
        return Err(GaitError::merge("unterminated conflict block"));
    }
    Ok(Some(ConflictSides { ours, theirs }))
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}

/// Splits a conflicted state file and merges both sides.
///
/// Text without conflict markers is validated and returned as is.
pub fn resolve_conflicted(text: &str) -> Result<StashedState> {
    match split_conflict_markers(text)? {
        Some(sides) => super::merge_documents(None, &sides.ours, &sides.theirs),
        None => crate::state::schema::parse_strict(text),
    }
}
