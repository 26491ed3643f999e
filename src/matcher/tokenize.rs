//! Word-set tokenization and similarity scoring

use std::collections::HashSet;

/// Lowercase, split on whitespace and keep tokens longer than `min_len` characters
pub fn tokenize(text: &str, min_len: usize) -> HashSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() > min_len)
        .collect()
}

/// Jaccard similarity between two token sets
///
/// Two empty sets score 0 rather than dividing by zero.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let shared = a.intersection(b).count();
    let total = a.union(b).count();

    if total == 0 {
        0.0
    } else {
        shared as f64 / total as f64
    }
}
