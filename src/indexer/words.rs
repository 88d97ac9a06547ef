// file: src/indexer/words.rs
// description: OCR token normalization and word filtering
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    // Letters plus interior hyphens/underscores only; digits and other
    // punctuation disqualify the whole token.
    pub static ref WORD: Regex = Regex::new(r"^[a-zA-Z_-]*$").expect("WORD regex is valid");
}

/// A token qualifies as an indexable word when it is made of letters,
/// hyphens and underscores only, and is longer than one character.
pub fn is_word(token: &str) -> bool {
    WORD.is_match(token) && token.len() > 1
}

/// Normalize raw OCR text into the set of indexable words.
///
/// Splits on whitespace, strips leading/trailing `-` and `_`, lowercases,
/// then keeps only tokens that pass [`is_word`]. Returns a sorted set so
/// downstream persistence is deterministic.
pub fn normalize_and_filter(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c| c == '-' || c == '_')
                .to_lowercase()
        })
        .filter(|token| is_word(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_valid_words_lowercased_and_stripped() {
        assert_eq!(normalize_and_filter("Cache -API- _node_"), set(&["api", "cache", "node"]));
    }

    #[test]
    fn test_digits_and_punctuation_rejected() {
        assert_eq!(normalize_and_filter("token123 a1b (proxy) 42"), BTreeSet::new());
    }

    #[test]
    fn test_single_characters_rejected() {
        // "_x_" strips down to a single character and drops out.
        assert_eq!(normalize_and_filter("a X _x_ -"), BTreeSet::new());
    }

    #[test]
    fn test_interior_hyphens_survive() {
        let words = normalize_and_filter("Cache-Node token123 -API-");
        assert_eq!(words, set(&["api", "cache-node"]));
    }

    #[test]
    fn test_newlines_treated_as_whitespace() {
        let words = normalize_and_filter("load\nbalancer\nqueue");
        assert_eq!(words, set(&["balancer", "load", "queue"]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let words = normalize_and_filter("cache Cache CACHE");
        assert_eq!(words, set(&["cache"]));
    }

    #[test]
    fn test_is_word() {
        assert!(is_word("gateway"));
        assert!(is_word("load-balancer"));
        assert!(is_word("shard_map"));
        assert!(!is_word("k8s"));
        assert!(!is_word("x"));
        assert!(!is_word(""));
        assert!(!is_word("cpu%"));
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_and_filter("").is_empty());
        assert!(normalize_and_filter("   \n\t ").is_empty());
    }
}
