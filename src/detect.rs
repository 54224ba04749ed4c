//! Cheap heuristic check for whether a text span is already in English.
//!
//! False results are harmless: the worst case is one extra, idempotent
//! translation call. The check is ASCII-ratio plus the presence of at least
//! one very common English function word.

/// Minimum fraction of ASCII characters for a span to count as English.
const ASCII_RATIO_THRESHOLD: f64 = 0.8;

/// Very common short English function words, matched as whole words.
const COMMON_ENGLISH_WORDS: &[&str] = &[
    "the", "and", "is", "in", "to", "of", "a", "that", "it", "with", "for", "as", "was", "on",
    "are", "you", "this", "be", "at", "have",
];

/// Returns true when the text looks like it is already in English.
pub fn looks_like_english(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let ascii = text.chars().filter(|c| c.is_ascii()).count();
    let ascii_ratio = ascii as f64 / total as f64;
    if ascii_ratio <= ASCII_RATIO_THRESHOLD {
        return false;
    }

    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| COMMON_ENGLISH_WORDS.contains(&word))
}
