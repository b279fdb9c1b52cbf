//! JSON path engine
//!
//! Canonicalization plus the three walkers (`get`, `set`, `delete`) used by
//! the JSON.* handlers. All walkers operate on [`serde_json::Value`]; there
//! is no in-place string surgery anywhere.

use serde_json::{Map, Value};

/// Strip the rooted prefix for display purposes (`$.a.b` → `a.b`,
/// `$[0]` → `[0]`). JSON.GET projection replies key their results by this
/// cleaned form.
pub fn clean_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("$.") {
        stripped.to_string()
    } else if path.starts_with("$[") {
        path[1..].to_string()
    } else {
        path.to_string()
    }
}

/// Canonicalize a path into its token sequence. An empty path or `$` is the
/// whole document (empty token list).
pub fn parse_path(path: &str) -> Vec<String> {
    let body = if path == "$" {
        ""
    } else if let Some(stripped) = path.strip_prefix("$.") {
        stripped
    } else if let Some(stripped) = path.strip_prefix('$') {
        stripped
    } else {
        path
    };

    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in body.chars() {
        match c {
            '.' | '[' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ']' => {}
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Resolve a token sequence against a document. `None` on any missing
/// field, out-of-range index, or scalar intermediate.
pub fn get<'a>(doc: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => map.get(token.as_str())?,
            Value::Array(arr) => arr.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign a value at a token sequence, creating missing intermediates:
/// `{}` when the following token is a field, `[]` when it is an index.
/// An index equal to the current array length appends; larger indices fail.
/// Setting the root requires the document to be an object and merges an
/// object value into it.
pub fn set(doc: &mut Value, tokens: &[String], value: Value) -> bool {
    let (last, init) = match tokens.split_last() {
        Some(parts) => parts,
        None => return merge_root(doc, value),
    };

    let mut current = doc;
    for (i, token) in init.iter().enumerate() {
        let next = init.get(i + 1).unwrap_or(last);
        current = match current {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| empty_container(next)),
            Value::Array(arr) => {
                let idx = match token.parse::<usize>() {
                    Ok(idx) => idx,
                    Err(_) => return false,
                };
                if idx == arr.len() {
                    arr.push(empty_container(next));
                } else if idx > arr.len() {
                    return false;
                }
                &mut arr[idx]
            }
            _ => return false,
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        Value::Array(arr) => match last.parse::<usize>() {
            Ok(idx) if idx < arr.len() => {
                arr[idx] = value;
                true
            }
            Ok(idx) if idx == arr.len() => {
                arr.push(value);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Remove the value at a token sequence. Returns 1-as-true when something
/// was removed, false when the path did not resolve.
pub fn delete(doc: &mut Value, tokens: &[String]) -> bool {
    let (last, init) = match tokens.split_last() {
        Some(parts) => parts,
        None => return false,
    };

    let mut current = doc;
    for token in init {
        current = match current {
            Value::Object(map) => match map.get_mut(token.as_str()) {
                Some(next) => next,
                None => return false,
            },
            Value::Array(arr) => {
                let idx = match token.parse::<usize>() {
                    Ok(idx) => idx,
                    Err(_) => return false,
                };
                match arr.get_mut(idx) {
                    Some(next) => next,
                    None => return false,
                }
            }
            _ => return false,
        };
    }

    match current {
        Value::Object(map) => map.shift_remove(last.as_str()).is_some(),
        Value::Array(arr) => match last.parse::<usize>() {
            Ok(idx) if idx < arr.len() => {
                arr.remove(idx);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn merge_root(doc: &mut Value, value: Value) -> bool {
    match (doc, value) {
        (Value::Object(target), Value::Object(source)) => {
            for (k, v) in source {
                target.insert(k, v);
            }
            true
        }
        _ => false,
    }
}

fn empty_container(next_token: &str) -> Value {
    if is_index(next_token) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn is_index(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
