//! Exact-set matching.
//!
//! Every document line whose trimmed text appears in the set of added lines is
//! a candidate; candidates are merged into maximal contiguous runs and noisy
//! runs are discarded.

use std::collections::HashSet;

use super::LineRange;

/// Noise guards for [`match_exact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactMatchOptions {
    /// Minimum number of distinct added lines before partial runs are trusted
    pub min_added_lines: usize,
    /// Minimum lines with alphanumeric content a run must contain
    pub min_alphanumeric_lines: usize,
}

impl Default for ExactMatchOptions {
    fn default() -> Self {
        Self {
            min_added_lines: 3,
            min_alphanumeric_lines: 2,
        }
    }
}

fn text<S: AsRef<str>>(line: &S) -> &str {
    line.as_ref()
}

fn has_alphanumeric(line: &str) -> bool {
    line.chars().any(char::is_alphanumeric)
}

/// Finds the runs of `document_lines` made only of lines from `added_lines`.
///
/// A run is kept when it holds at least `min_alphanumeric_lines` lines with
/// alphanumeric content, and either the added set has at least
/// `min_added_lines` members or the run reproduces the whole added set.
pub fn match_exact<D, A>(document_lines: &[D], added_lines: &[A], options: ExactMatchOptions) -> Vec<LineRange>
where
    D: AsRef<str>,
    A: AsRef<str>,
{
    let added: HashSet<&str> = added_lines
        .iter()
        .map(|line| text(line).trim())
        .filter(|line| !line.is_empty())
        .collect();
    if added.is_empty() {
        return Vec::new();
    }

    let mut runs: Vec<LineRange> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (index, line) in document_lines.iter().enumerate() {
        let trimmed = text(line).trim();
        let candidate = !trimmed.is_empty() && added.contains(trimmed);
        match (candidate, run_start) {
            (true, None) => run_start = Some(index),
            (false, Some(start)) => {
                runs.push(LineRange::new(start, index - 1));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(LineRange::new(start, document_lines.len() - 1));
    }

    runs.into_iter()
        .filter(|run| {
            let lines = &document_lines[run.start_line..=run.end_line];
            let alphanumeric = lines
                .iter()
                .filter(|line| has_alphanumeric(text(*line)))
                .count();
            if alphanumeric < options.min_alphanumeric_lines {
                return false;
            }
            if added.len() >= options.min_added_lines {
                return true;
            }
            let covered: HashSet<&str> = lines.iter().map(|line| text(line).trim()).collect();
            covered.len() == added.len()
        })
        .collect()
}
