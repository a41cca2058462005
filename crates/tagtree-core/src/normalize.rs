//! Search normalisation
//!
//! Tag names are compared for search after canonical decomposition with all
//! combining marks removed, then lowercased. `"Tag test áéíóúçýỷủ"` and
//! `"tag test aeioucyyu"` normalise to the same string.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics and fold case so a string can be compared with plain
/// Latin input.
pub fn normalize_for_search(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize_for_search("áéíóúçýỷủ"), "aeioucyyu");
    }

    #[test]
    fn test_folds_case() {
        assert_eq!(normalize_for_search("Dark AMBIENT"), "dark ambient");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_for_search(""), "");
    }

    #[test]
    fn test_leaves_punctuation() {
        assert_eq!(
            normalize_for_search("Industrial & Noise"),
            "industrial & noise"
        );
    }
}
