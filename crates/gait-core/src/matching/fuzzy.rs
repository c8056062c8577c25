//! Fuzzy block matching.
//!
//! Greedy largest-block-first alignment of added lines onto a document. Each
//! round scans every block size from the whole remaining pool down to
//! `min(pool, 2)`, every added-line offset and every document offset, and keeps
//! the single best window. Ties keep the first window found (block size
//! descending, added offset ascending, document offset ascending). The winner
//! is accepted when it reaches the threshold, its lines leave the pool and the
//! next round starts.
//!
//! Pairwise line similarities are computed once per call; window scores come
//! from diagonal prefix sums so each window costs O(1). Work is capped twice:
//! a call needing more than `max_line_comparisons` similarities is skipped, and
//! once `max_window_evaluations` windows have been scored the scan stops and
//! the blocks accepted so far are returned.

use super::LineRange;
use super::similarity::line_similarity;

const PERFECT: f64 = 1.0 - 1e-12;

/// Tuning for [`match_fuzzy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatchOptions {
    /// Minimum average similarity for a block to be accepted
    pub threshold: f64,
    /// Documents longer than this are not scanned
    pub max_document_lines: usize,
    /// Added lines beyond this count are ignored
    pub max_added_lines: usize,
    /// Upper bound on added lines × document lines
    pub max_line_comparisons: usize,
    /// Windows scored per call, across all rounds
    pub max_window_evaluations: u64,
}

impl Default for FuzzyMatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_document_lines: 5_000,
            max_added_lines: 200,
            max_line_comparisons: 100_000,
            max_window_evaluations: 20_000_000,
        }
    }
}

impl FuzzyMatchOptions {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

/// An accepted alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Matched document lines
    pub range: LineRange,
    /// Indices (into the non-blank added lines) that were matched, in order
    pub added_indices: Vec<usize>,
    /// Average line similarity of the block
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    size: usize,
    pool_offset: usize,
    doc_offset: usize,
}

/// Scratch buffers and budget shared by every round of one call.
struct Scanner<'a> {
    similarity: &'a [Vec<f64>],
    doc_len: usize,
    /// Flattened `(pool + 1) × (doc_len + 1)` diagonal prefix sums
    diag: Vec<f64>,
    used_prefix: Vec<usize>,
    remaining: u64,
}

impl<'a> Scanner<'a> {
    fn new(similarity: &'a [Vec<f64>], doc_len: usize, budget: u64) -> Self {
        Self {
            similarity,
            doc_len,
            diag: vec![0.0; (similarity.len() + 1) * (doc_len + 1)],
            used_prefix: vec![0; doc_len + 1],
            remaining: budget,
        }
    }

    fn at(&self, p: usize, j: usize) -> f64 {
        self.diag[p * (self.doc_len + 1) + j]
    }

    /// Best window over the current pool.
    ///
    /// Returns `Err(())` when the evaluation budget ran out before the scan
    /// finished.
    fn best_window(&mut self, pool: &[usize], used: &[bool]) -> Result<Option<Candidate>, ()> {
        let n = pool.len();
        let doc_len = self.doc_len;
        let width = doc_len + 1;
        let min_block = n.min(2);
        let similarity = self.similarity;

        // diag[p + 1][j + 1] = sum of similarity[pool[p - k]][j - k] for k >= 0
        for p in 0..n {
            let row = &similarity[pool[p]];
            for j in 0..doc_len {
                self.diag[(p + 1) * width + j + 1] = self.diag[p * width + j] + row[j];
            }
        }
        // used_prefix[j] = number of used document lines before j
        for j in 0..doc_len {
            self.used_prefix[j + 1] = self.used_prefix[j] + usize::from(used[j]);
        }

        let mut best: Option<Candidate> = None;
        for size in (min_block..=n).rev() {
            if size > doc_len {
                continue;
            }
            for pool_offset in 0..=(n - size) {
                for doc_offset in 0..=(doc_len - size) {
                    if self.remaining == 0 {
                        return Err(());
                    }
                    self.remaining -= 1;
                    if self.used_prefix[doc_offset + size] - self.used_prefix[doc_offset] > 0 {
                        continue;
                    }
                    let total = self.at(pool_offset + size, doc_offset + size) - self.at(pool_offset, doc_offset);
                    let score = total / size as f64;
                    if best.is_none_or(|b| score > b.score) {
                        best = Some(Candidate {
                            score,
                            size,
                            pool_offset,
                            doc_offset,
                        });
                        if score >= PERFECT {
                            return Ok(best);
                        }
                    }
                }
            }
        }
        Ok(best)
    }
}

/// Aligns `added_lines` onto `document_lines`.
///
/// Blank added lines are ignored. Matched document lines are never reused by
/// a later round.
pub fn match_fuzzy<D, A>(document_lines: &[D], added_lines: &[A], options: FuzzyMatchOptions) -> Vec<FuzzyMatch>
where
    D: AsRef<str>,
    A: AsRef<str>,
{
    let doc_len = document_lines.len();
    if doc_len > options.max_document_lines {
        tracing::debug!(
            "Skipping fuzzy match: document has {} lines (limit {})",
            doc_len,
            options.max_document_lines
        );
        return Vec::new();
    }

    let added: Vec<&str> = added_lines
        .iter()
        .map(|line| line.as_ref())
        .filter(|line| !line.trim().is_empty())
        .take(options.max_added_lines)
        .collect();
    if added.is_empty() || doc_len == 0 {
        return Vec::new();
    }
    let comparisons = added.len().saturating_mul(doc_len);
    if comparisons > options.max_line_comparisons {
        tracing::debug!(
            "Skipping fuzzy match: {} added x {} document lines exceeds {} comparisons",
            added.len(),
            doc_len,
            options.max_line_comparisons
        );
        return Vec::new();
    }

    // similarity[i][j]: added line i vs document line j
    let similarity: Vec<Vec<f64>> = added
        .iter()
        .map(|a| {
            document_lines
                .iter()
                .map(|d| line_similarity(a, d.as_ref()))
                .collect()
        })
        .collect();

    let mut scanner = Scanner::new(&similarity, doc_len, options.max_window_evaluations);
    let mut pool: Vec<usize> = (0..added.len()).collect();
    let mut used = vec![false; doc_len];
    let mut matches = Vec::new();

    while !pool.is_empty() {
        let best = match scanner.best_window(&pool, &used) {
            Ok(best) => best,
            Err(()) => {
                tracing::debug!(
                    "Fuzzy match budget of {} windows exhausted after {} blocks",
                    options.max_window_evaluations,
                    matches.len()
                );
                break;
            }
        };
        match best {
            Some(candidate) if candidate.score >= options.threshold => {
                let added_indices: Vec<usize> = pool
                    .drain(candidate.pool_offset..candidate.pool_offset + candidate.size)
                    .collect();
                for flag in &mut used[candidate.doc_offset..candidate.doc_offset + candidate.size] {
                    *flag = true;
                }
                matches.push(FuzzyMatch {
                    range: LineRange::new(
                        candidate.doc_offset,
                        candidate.doc_offset + candidate.size - 1,
                    ),
                    added_indices,
                    similarity: candidate.score,
                });
            }
            _ => break,
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_accepts_and_rejects() {
        let doc = ["const x = 1;"];
        let added = ["const x = 2;"];

        let accepted = match_fuzzy(&doc, &added, FuzzyMatchOptions::with_threshold(0.8));
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].range, LineRange::new(0, 0));
        assert!(accepted[0].similarity > 0.9 && accepted[0].similarity < 0.95);

        let rejected = match_fuzzy(&doc, &added, FuzzyMatchOptions::with_threshold(0.95));
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        let doc = ["a"];
        let none: [&str; 0] = [];
        assert!(match_fuzzy(&doc, &none, FuzzyMatchOptions::default()).is_empty());
        assert!(match_fuzzy(&none, &doc, FuzzyMatchOptions::default()).is_empty());
    }

    #[test]
    fn test_prefers_one_large_block() {
        let doc = [
            "use std::io;",
            "fn read() -> io::Result<String> {",
            "    let mut s = String::new();",
            "    io::stdin().read_line(&mut s)?;",
            "    Ok(s)",
            "}",
        ];
        let added = [
            "fn read() -> io::Result<String> {",
            "    let mut s = String::new();",
            "    io::stdin().read_line(&mut s)?;",
            "    Ok(s)",
        ];
        let matches = match_fuzzy(&doc, &added, FuzzyMatchOptions::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].range, LineRange::new(1, 4));
        assert_eq!(matches[0].added_indices, vec![0, 1, 2, 3]);
        assert_eq!(matches[0].similarity, 1.0);
    }

    #[test]
    fn test_split_blocks_are_matched_in_rounds() {
        let doc = [
            "let alpha = compute_alpha();",
            "let beta = compute_beta();",
            "// unrelated comment here",
            "// another unrelated thing",
            "let gamma = compute_gamma();",
            "let delta = compute_delta();",
        ];
        let added = [
            "let alpha = compute_alpha();",
            "let beta = compute_beta();",
            "let gamma = compute_gamma();",
            "let delta = compute_delta();",
        ];
        let mut matches = match_fuzzy(&doc, &added, FuzzyMatchOptions::default());
        matches.sort_by_key(|m| m.range);
        let ranges: Vec<LineRange> = matches.iter().map(|m| m.range).collect();
        assert_eq!(ranges, vec![LineRange::new(0, 1), LineRange::new(4, 5)]);
    }

    #[test]
    fn test_ties_keep_first_document_position() {
        let doc = ["x = compute(1)", "x = compute(1)"];
        let added = ["x = compute(1)"];
        let matches = match_fuzzy(&doc, &added, FuzzyMatchOptions::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].range, LineRange::new(0, 0));
    }

    #[test]
    fn test_document_shorter_than_block() {
        let doc = ["only line here"];
        let added = ["only line here", "second line", "third line"];
        // the 3- and 2-line blocks cannot fit; after no block matches nothing is returned
        let matches = match_fuzzy(&doc, &added, FuzzyMatchOptions::default());
        assert!(matches.is_empty());
    }

    #[test]
    fn test_oversized_document_is_skipped() {
        let doc = vec!["line"; 10];
        let added = ["line"];
        let options = FuzzyMatchOptions {
            max_document_lines: 5,
            ..FuzzyMatchOptions::default()
        };
        assert!(match_fuzzy(&doc, &added, options).is_empty());
    }

    #[test]
    fn test_too_many_comparisons_is_skipped() {
        let doc = vec!["let value = 1;"; 10];
        let added = ["let value = 1;", "let other = 2;", "let third = 3;"];
        let options = FuzzyMatchOptions {
            max_line_comparisons: 29,
            ..FuzzyMatchOptions::default()
        };
        assert!(match_fuzzy(&doc, &added, options).is_empty());

        let options = FuzzyMatchOptions {
            max_line_comparisons: 30,
            ..FuzzyMatchOptions::default()
        };
        assert!(!match_fuzzy(&doc, &added, options).is_empty());
    }

    #[test]
    fn test_window_budget_keeps_blocks_found_before_exhaustion() {
        let doc = [
            "let alpha = compute_alpha();",
            "let beta = compute_beta();",
            "// unrelated comment here",
            "// another unrelated thing",
            "let gamma = compute_gamma();",
            "let delta = compute_delta();",
        ];
        let added = [
            "let alpha = compute_alpha();",
            "let beta = compute_beta();",
            "let gamma = compute_gamma();",
            "let delta = compute_delta();",
        ];
        // first round scores 12 windows before hitting the perfect alpha/beta block
        let options = FuzzyMatchOptions {
            max_window_evaluations: 14,
            ..FuzzyMatchOptions::default()
        };
        let matches = match_fuzzy(&doc, &added, options);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].range, LineRange::new(0, 1));

        let options = FuzzyMatchOptions {
            max_window_evaluations: 0,
            ..FuzzyMatchOptions::default()
        };
        assert!(match_fuzzy(&doc, &added, options).is_empty());
    }
}
