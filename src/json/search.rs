//! Whole-word JSON search
//!
//! Recursive, case-insensitive search over every string in a document.
//! A term matches only when both ends of the occurrence sit on a word
//! boundary: the string edge or a non-alphanumeric byte. ASCII rules only;
//! there is no Unicode case folding beyond ASCII tolower.

use serde_json::Value;

/// Does any string anywhere in `value` contain `term` as a whole word?
pub fn contains_word(value: &Value, term: &str) -> bool {
    match value {
        Value::String(text) => string_contains_word(text, term),
        Value::Array(items) => items.iter().any(|item| contains_word(item, term)),
        Value::Object(map) => map.values().any(|item| contains_word(item, term)),
        _ => false,
    }
}

fn string_contains_word(text: &str, term: &str) -> bool {
    let text = text.as_bytes();
    let term = term.as_bytes();
    if term.is_empty() || term.len() > text.len() {
        return false;
    }

    for start in 0..=(text.len() - term.len()) {
        if !text[start..start + term.len()].eq_ignore_ascii_case(term) {
            continue;
        }
        let end = start + term.len();
        let left_ok = start == 0 || is_word_delimiter(text[start - 1]);
        let right_ok = end == text.len() || is_word_delimiter(text[end]);
        if left_ok && right_ok {
            return true;
        }
    }
    false
}

// A delimiter is anything that is not a letter or a digit.
fn is_word_delimiter(c: u8) -> bool {
    !c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_whole_words_only() {
        let doc = json!({"text": "The quickfox jumps over the fox"});
        assert!(contains_word(&doc, "fox"));
        assert!(contains_word(&doc, "quickfox"));
        assert!(!contains_word(&doc, "quick"));
    }

    #[test]
    fn is_case_insensitive() {
        let doc = json!(["Ada Lovelace", "Graph Theory"]);
        assert!(contains_word(&doc, "ADA"));
        assert!(contains_word(&doc, "graph"));
    }

    #[test]
    fn punctuation_is_a_boundary() {
        let doc = json!({"note": "ship-it, now."});
        assert!(contains_word(&doc, "ship"));
        assert!(contains_word(&doc, "it"));
        assert!(contains_word(&doc, "now"));
    }

    #[test]
    fn recurses_through_nesting() {
        let doc = json!({"a": [{"b": {"c": "deep word here"}}]});
        assert!(contains_word(&doc, "word"));
        assert!(!contains_word(&doc, "absent"));
    }

    #[test]
    fn non_strings_never_match() {
        assert!(!contains_word(&json!(42), "42"));
        assert!(!contains_word(&json!(true), "true"));
        assert!(!contains_word(&json!(null), "null"));
    }
}
