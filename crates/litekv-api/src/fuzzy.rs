//! Approximate key matching.
//!
//! Scores are Jaro–Winkler similarity scaled to 0–100. Comparison is
//! case-sensitive and works on Unicode scalar values.

use litekv_core::Document;

/// Maximum number of results returned by a fuzzy search
pub const MAX_RESULTS: usize = 5;

/// Winkler prefix scaling factor
const PREFIX_SCALE: f64 = 0.1;

/// Longest common prefix Winkler rewards
const MAX_PREFIX: usize = 4;

/// A key that matched a fuzzy query
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// The matching key
    pub key: String,
    /// Similarity on a 0–100 scale
    pub score: f64,
}

/// Jaro similarity in `[0, 1]`.
pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Matched characters that appear in a different order
    let mut half_transpositions = 0usize;
    let mut k = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ca != b[k] {
            half_transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = half_transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro–Winkler similarity in `[0, 1]`.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let sim = jaro(a, b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .take(MAX_PREFIX)
        .count();
    sim + prefix as f64 * PREFIX_SCALE * (1.0 - sim)
}

/// Similarity of two strings on a 0–100 scale.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 100.0
}

/// Best [`MAX_RESULTS`] keys of `map` whose similarity to `query` is at
/// least `threshold`, best first. Equal scores keep map order.
pub fn rank(map: &Document, query: &str, threshold: f64) -> Vec<FuzzyMatch> {
    let mut matches: Vec<FuzzyMatch> = map
        .keys()
        .map(|key| FuzzyMatch {
            key: key.clone(),
            score: similarity(query, key),
        })
        .filter(|m| m.score >= threshold)
        .collect();

    // Stable sort: ties stay in map order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(MAX_RESULTS);
    matches
}
