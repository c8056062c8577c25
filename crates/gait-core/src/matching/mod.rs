//! Content matching.
//!
//! Maps AI-produced lines (code blocks from a panel chat response, added lines
//! from an inline chat diff) back onto the current text of a document.
//!
//! - `exact`: cheap exact-set pass used for panel chat code blocks
//! - `fuzzy`: greedy largest-block-first alignment used for inline chat diffs
//! - `similarity`: normalized Levenshtein line similarity
//! - `code_blocks`: fenced code block extraction

pub mod code_blocks;
pub mod exact;
pub mod fuzzy;
pub mod similarity;

use serde::{Deserialize, Serialize};

pub use code_blocks::{CodeBlock, code_block_lines, code_blocks};
pub use exact::{ExactMatchOptions, match_exact};
pub use fuzzy::{FuzzyMatch, FuzzyMatchOptions, match_fuzzy};
pub use similarity::{block_similarity, line_similarity};

/// Inclusive, zero-based range of document lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineRange {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        debug_assert!(start_line <= end_line);
        Self {
            start_line,
            end_line,
        }
    }

    pub fn len(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// Splits document text into lines the way editors number them.
pub fn document_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}
