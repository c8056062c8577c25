//! Normalized line similarity.

/// Similarity of two lines in `[0, 1]`: `1 - levenshtein / max_len`.
///
/// Lines are compared trimmed, so re-indented code still scores as identical.
/// Two empty lines are identical.
pub fn line_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim();
    let b = b.trim();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64
}

/// Average per-line similarity of two equally sized blocks.
///
/// Returns `None` for empty blocks or blocks of different length.
pub fn block_similarity<A: AsRef<str>, B: AsRef<str>>(added: &[A], document: &[B]) -> Option<f64> {
    if added.is_empty() || added.len() != document.len() {
        return None;
    }
    let total: f64 = added
        .iter()
        .zip(document)
        .map(|(a, b)| line_similarity(a.as_ref(), b.as_ref()))
        .sum();
    Some(total / added.len() as f64)
}
