//! Trigram similarity compatible with PostgreSQL's `pg_trgm`.
//!
//! Text is lowercased and split into words at every non-alphanumeric
//! character. Each word is padded with two spaces in front and one behind,
//! and every 3-character window of the padded word is a trigram. Similarity
//! is the Jaccard index of the two trigram sets.

use std::collections::HashSet;

pub type Trigram = [char; 3];

/// Alphanumeric runs of `text`. Does not lowercase.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Trigrams of one word after `"  "` + word + `" "` padding.
#[must_use]
pub fn padded_trigrams(word: &str) -> Vec<Trigram> {
    let padded: Vec<char> = [' ', ' ']
        .into_iter()
        .chain(word.chars())
        .chain(std::iter::once(' '))
        .collect();
    padded
        .windows(3)
        .map(|window| [window[0], window[1], window[2]])
        .collect()
}

/// The set of trigrams for a whole string.
#[must_use]
pub fn trigram_set(text: &str) -> HashSet<Trigram> {
    let lowered = text.to_lowercase();
    words(&lowered).flat_map(padded_trigrams).collect()
}

/// `|A ∩ B| / |A ∪ B|`, or 0 when either side has no trigrams.
#[must_use]
pub fn set_similarity(left: &HashSet<Trigram>, right: &HashSet<Trigram>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// `pg_trgm`'s `similarity(left, right)`.
#[must_use]
pub fn similarity(left: &str, right: &str) -> f64 {
    set_similarity(&trigram_set(left), &trigram_set(right))
}
