//! JSON algebra tests
//!
//! Path canonicalization, the three walkers, and whole-word search.

use nukekv::json::{clean_path, contains_word, delete, get, parse_path, set};
use serde_json::json;

// =============================================================================
// Path Canonicalization Tests
// =============================================================================

#[test]
fn test_surface_forms_are_interchangeable() {
    assert_eq!(parse_path("a.b[0].c"), parse_path("$.a.b[0].c"));
    assert_eq!(parse_path("skills[2]"), parse_path("$.skills[2]"));
    assert_eq!(parse_path("$[0]"), vec!["0"]);
    assert!(parse_path("$").is_empty());
    assert!(parse_path("").is_empty());
}

#[test]
fn test_clean_path_strips_root_markers() {
    assert_eq!(clean_path("$.a.b[1]"), "a.b[1]");
    assert_eq!(clean_path("$[0]"), "[0]");
    assert_eq!(clean_path("address.city"), "address.city");
}

// =============================================================================
// Get Tests
// =============================================================================

#[test]
fn test_get_nested_paths() {
    let doc = json!({
        "name": "a",
        "address": {"city": "pune"},
        "skills": ["rust", "cpp", "sql"],
        "a": {"b": [10, 20, 30]}
    });

    assert_eq!(get(&doc, &parse_path("$.a.b[1]")), Some(&json!(20)));
    assert_eq!(get(&doc, &parse_path("address.city")), Some(&json!("pune")));
    assert_eq!(get(&doc, &parse_path("skills[2]")), Some(&json!("sql")));
    assert_eq!(get(&doc, &parse_path("$")), Some(&doc));
}

#[test]
fn test_get_misses_are_undefined() {
    let doc = json!({"a": {"b": [1]}, "s": "str"});

    assert_eq!(get(&doc, &parse_path("a.c")), None); // missing field
    assert_eq!(get(&doc, &parse_path("a.b[5]")), None); // out of range
    assert_eq!(get(&doc, &parse_path("s.x")), None); // scalar intermediate
    assert_eq!(get(&doc, &parse_path("a[0]")), None); // index into object
}

// =============================================================================
// Set Tests
// =============================================================================

#[test]
fn test_set_replaces_existing() {
    let mut doc = json!({"a": {"b": 1}});
    assert!(set(&mut doc, &parse_path("a.b"), json!(2)));
    assert_eq!(doc, json!({"a": {"b": 2}}));
}

#[test]
fn test_set_creates_object_and_array_intermediates() {
    let mut doc = json!({});
    assert!(set(&mut doc, &parse_path("users[0].name"), json!("ada")));
    assert_eq!(doc, json!({"users": [{"name": "ada"}]}));
}

#[test]
fn test_set_appends_at_length_only() {
    let mut doc = json!({"xs": [1, 2]});
    assert!(set(&mut doc, &parse_path("xs[2]"), json!(3)));
    assert!(!set(&mut doc, &parse_path("xs[10]"), json!(99)));
    assert_eq!(doc, json!({"xs": [1, 2, 3]}));
}

#[test]
fn test_set_root_merge() {
    let mut doc = json!({"keep": 1});
    assert!(set(&mut doc, &parse_path("$"), json!({"add": 2})));
    assert_eq!(doc, json!({"keep": 1, "add": 2}));

    // Non-object payloads cannot replace the root.
    assert!(!set(&mut doc, &parse_path("$"), json!([1, 2])));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_field_and_element() {
    let mut doc = json!({"a": 1, "xs": [10, 20, 30]});
    assert!(delete(&mut doc, &parse_path("a")));
    assert!(delete(&mut doc, &parse_path("xs[1]")));
    assert_eq!(doc, json!({"xs": [10, 30]}));
}

#[test]
fn test_delete_missing_returns_zero() {
    let mut doc = json!({"a": 1});
    assert!(!delete(&mut doc, &parse_path("b")));
    assert!(!delete(&mut doc, &parse_path("a.b.c")));
    assert_eq!(doc, json!({"a": 1}));
}

// =============================================================================
// Whole-Word Search Tests
// =============================================================================

#[test]
fn test_search_rejects_substrings_inside_words() {
    let doc = json!({"text": "The quickfox jumps over the fox"});
    // "fox" in "quickfox" is not a whole word; the standalone one is.
    assert!(contains_word(&doc, "fox"));
    assert!(!contains_word(&doc, "quick"));
    assert!(!contains_word(&doc, "ox"));
}

#[test]
fn test_search_boundaries_at_edges_and_punctuation() {
    assert!(contains_word(&json!("fox"), "fox"));
    assert!(contains_word(&json!("a fox."), "fox"));
    assert!(contains_word(&json!("(fox)"), "fox"));
    assert!(contains_word(&json!("fox-trot"), "fox"));
    assert!(!contains_word(&json!("foxy"), "fox"));
}

#[test]
fn test_search_is_ascii_case_insensitive() {
    let doc = json!({"title": "Senior Rust Engineer"});
    assert!(contains_word(&doc, "RUST"));
    assert!(contains_word(&doc, "rust"));
}

#[test]
fn test_search_recurses_containers() {
    let doc = json!([
        {"bio": {"skills": ["systems", "databases"]}},
        {"bio": {"skills": []}}
    ]);
    assert!(contains_word(&doc, "databases"));
    assert!(!contains_word(&doc, "compilers"));
}

#[test]
fn test_search_ignores_numbers_and_bools() {
    let doc = json!({"n": 42, "ok": true});
    assert!(!contains_word(&doc, "42"));
    assert!(!contains_word(&doc, "true"));
}
