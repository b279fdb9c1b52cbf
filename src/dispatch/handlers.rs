//! Command handlers
//!
//! One function per command. Each takes the argv tail (the command name is
//! already stripped) and the store, and returns a [`Reply`]. Status codes
//! exist for tests and future transports; the wire only carries the text.

use serde_json::Value;

use crate::config::MAX_VALUE_SIZE;
use crate::json;
use crate::persistence;
use crate::store::{IncrError, MutateOutcome, MutateResult, Store, TtlStatus};
use crate::VERSION;

use super::stress;

/// Reply status classes (never serialized to the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    Internal = 500,
}

/// What a handler hands back to the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: StatusCode,
    pub text: String,
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Ok,
            text: text.into(),
        }
    }

    pub fn bad(text: impl Into<String>) -> Self {
        Self {
            code: StatusCode::BadRequest,
            text: text.into(),
        }
    }

    pub fn not_found(text: impl Into<String>) -> Self {
        Self {
            code: StatusCode::NotFound,
            text: text.into(),
        }
    }

    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Internal,
            text: text.into(),
        }
    }
}

/// Every command the engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Set,
    Get,
    Update,
    Del,
    Incr,
    Decr,
    Ttl,
    Expire,
    JsonSet,
    JsonGet,
    JsonUpdate,
    JsonDel,
    JsonAppend,
    JsonSearch,
    Stats,
    Stress,
    Batch,
    Debug,
    Clrdb,
    Similar,
}

impl CommandKind {
    /// Look up an (already uppercased) command name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "SET" => Self::Set,
            "GET" => Self::Get,
            "UPDATE" => Self::Update,
            "DEL" => Self::Del,
            "INCR" => Self::Incr,
            "DECR" => Self::Decr,
            "TTL" => Self::Ttl,
            "EXPIRE" => Self::Expire,
            "JSON.SET" => Self::JsonSet,
            "JSON.GET" => Self::JsonGet,
            "JSON.UPDATE" => Self::JsonUpdate,
            "JSON.DEL" => Self::JsonDel,
            "JSON.APPEND" => Self::JsonAppend,
            "JSON.SEARCH" => Self::JsonSearch,
            "STATS" => Self::Stats,
            "STRESS" => Self::Stress,
            "BATCH" => Self::Batch,
            "DEBUG" => Self::Debug,
            "CLRDB" => Self::Clrdb,
            "SIMILAR" => Self::Similar,
            _ => return None,
        })
    }
}

/// Run one command. The unknown-command branch is the only fallback.
pub fn execute(store: &Store, command: &str, args: &[String]) -> Reply {
    let kind = match CommandKind::from_name(command) {
        Some(kind) => kind,
        None => return Reply::bad(format!("-ERR unknown command '{command}'")),
    };

    match kind {
        CommandKind::Set => handle_set(store, args),
        CommandKind::Get => handle_get(store, args),
        CommandKind::Update => handle_update(store, args),
        CommandKind::Del => handle_del(store, args),
        CommandKind::Incr => handle_incr_decr(store, args, true),
        CommandKind::Decr => handle_incr_decr(store, args, false),
        CommandKind::Ttl => handle_ttl(store, args),
        CommandKind::Expire => handle_expire(store, args),
        CommandKind::JsonSet => handle_json_set(store, args),
        CommandKind::JsonGet => handle_json_get(store, args),
        CommandKind::JsonUpdate => handle_json_update(store, args),
        CommandKind::JsonDel => handle_json_del(store, args),
        CommandKind::JsonAppend => handle_json_append(store, args),
        CommandKind::JsonSearch => handle_json_search(store, args),
        CommandKind::Stats => handle_stats(store),
        CommandKind::Stress => handle_stress(args),
        CommandKind::Batch => handle_batch(store, args),
        CommandKind::Debug => handle_debug(store, args),
        CommandKind::Clrdb => handle_clrdb(store),
        CommandKind::Similar => handle_similar(store, args),
    }
}

// =============================================================================
// String commands
// =============================================================================

fn handle_set(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 && args.len() != 4 {
        return Reply::bad(
            "-ERR wrong number of arguments for 'SET'. Expected: SET <key> \"<value>\" [EX <seconds>]",
        );
    }
    if args[1].len() as u64 > MAX_VALUE_SIZE {
        return Reply::bad("-ERR value too large");
    }

    let ttl = match parse_ex_tail(args) {
        Ok(ttl) => ttl,
        Err(reply) => return reply,
    };
    store.put(&args[0], args[1].clone(), ttl);
    Reply::ok("+OK")
}

fn handle_get(store: &Store, args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR wrong number of arguments");
    }
    match store.get(&args[0]) {
        Some(value) => Reply::ok(value),
        None => Reply::not_found("(nil)"),
    }
}

fn handle_update(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 {
        return Reply::bad(
            "-ERR wrong number of arguments for 'UPDATE'. Expected: UPDATE <key> \"<value>\"",
        );
    }
    if args[1].len() as u64 > MAX_VALUE_SIZE {
        return Reply::bad("-ERR value too large");
    }
    if store.update(&args[0], args[1].clone()) {
        Reply::ok("+OK")
    } else {
        Reply::not_found("(nil)")
    }
}

fn handle_del(store: &Store, args: &[String]) -> Reply {
    if args.is_empty() {
        return Reply::bad("-ERR wrong number of arguments");
    }
    Reply::ok(store.del(args).to_string())
}

fn handle_incr_decr(store: &Store, args: &[String], is_incr: bool) -> Reply {
    if args.is_empty() || args.len() > 2 {
        return Reply::bad("-ERR wrong number of arguments");
    }
    let amount = match args.get(1) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) => n,
            Err(_) => return Reply::bad("-ERR not an integer"),
        },
        None => 1,
    };
    match store.incr_decr(&args[0], amount, is_incr) {
        Ok(value) => Reply::ok(value.to_string()),
        Err(IncrError::NotInteger) => Reply::bad("-ERR value is not an integer"),
    }
}

fn handle_ttl(store: &Store, args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR wrong number of arguments");
    }
    match store.ttl(&args[0]) {
        TtlStatus::Missing => Reply::not_found("(nil)"),
        TtlStatus::NoExpiry => Reply::ok("-1"),
        TtlStatus::Seconds(secs) => Reply::ok(secs.to_string()),
    }
}

fn handle_expire(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 {
        return Reply::bad("-ERR wrong number of arguments");
    }
    let seconds = match args[1].parse::<i64>() {
        Ok(n) => n,
        Err(_) => return Reply::bad("-ERR invalid TTL value"),
    };
    if store.expire(&args[0], seconds) {
        Reply::ok("+OK")
    } else {
        Reply::not_found("(nil)")
    }
}

// =============================================================================
// JSON commands
// =============================================================================

fn handle_json_set(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 && args.len() != 4 {
        return Reply::bad(
            "-ERR wrong number of arguments for 'JSON.SET'. Expected: JSON.SET <key> '<value>' [EX <seconds>]",
        );
    }

    let doc: Value = match serde_json::from_str(&args[1]) {
        Ok(doc) => doc,
        Err(e) => return Reply::bad(format!("-ERR invalid JSON: {e}")),
    };
    let dump = doc.to_string();
    if dump.len() as u64 > MAX_VALUE_SIZE {
        return Reply::bad("-ERR value too large");
    }

    let ttl = match parse_ex_tail(args) {
        Ok(ttl) => ttl,
        Err(reply) => return reply,
    };
    store.put(&args[0], dump, ttl);
    Reply::ok("+OK")
}

fn handle_json_get(store: &Store, args: &[String]) -> Reply {
    if args.is_empty() {
        return Reply::bad("-ERR wrong number of arguments");
    }
    let key = &args[0];

    let raw = match store.read_value(key) {
        Some(raw) => raw,
        None => return Reply::not_found("(nil)"),
    };
    let doc: Value = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(_) => return Reply::internal("-ERR not a valid JSON document"),
    };

    let reply = if let Some(where_pos) = args.iter().position(|a| a == "WHERE") {
        if args.len() - where_pos != 3 {
            return Reply::bad("-ERR syntax: ... WHERE <field> <value>");
        }
        let items = match doc.as_array() {
            Some(items) => items,
            None => return Reply::bad("-ERR `WHERE` clause can only be used on JSON arrays."),
        };
        let field = &args[where_pos + 1];
        let needle = json_or_string(&args[where_pos + 2]);
        let matches: Vec<&Value> = items
            .iter()
            .filter(|item| where_matches(item, field, &needle))
            .collect();
        if matches.is_empty() {
            return Reply::not_found("[]");
        }
        Reply::ok(pretty(&Value::Array(
            matches.into_iter().cloned().collect(),
        )))
    } else if args.len() > 1 {
        // Projection: an object keyed by the cleaned paths, null on miss.
        let mut projected = serde_json::Map::new();
        for path in &args[1..] {
            let tokens = json::parse_path(path);
            let located = json::get(&doc, &tokens).cloned().unwrap_or(Value::Null);
            projected.insert(json::clean_path(path), located);
        }
        Reply::ok(pretty(&Value::Object(projected)))
    } else {
        Reply::ok(pretty(&doc))
    };

    if !store.promote(key) {
        return Reply::not_found("(nil)");
    }
    reply
}

fn handle_json_update(store: &Store, args: &[String]) -> Reply {
    if args.len() < 4 {
        return Reply::bad("-ERR invalid syntax for JSON.UPDATE");
    }
    let where_pos = args.iter().position(|a| a == "WHERE");
    let set_pos = args.iter().position(|a| a == "SET");
    let (where_pos, set_pos) = match (where_pos, set_pos) {
        (Some(w), Some(s)) if s == w + 3 => (w, s),
        _ => {
            return Reply::bad("-ERR syntax error. Expected: ... WHERE <field> <value> SET ...");
        }
    };
    let assignments = &args[set_pos + 1..];
    if assignments.len() < 2 || assignments.len() % 2 != 0 {
        return Reply::bad("-ERR syntax error. Expected: ... SET <field1> <value1> ...");
    }

    let field = args[where_pos + 1].clone();
    let needle = json_or_string(&args[where_pos + 2]);

    let result = store.mutate_value(&args[0], |raw| {
        let mut doc: Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(_) => return MutateOutcome::Keep(Reply::internal("-ERR not a valid JSON document")),
        };
        let items = match doc.as_array_mut() {
            Some(items) => items,
            None => {
                return MutateOutcome::Keep(Reply::bad(
                    "-ERR `WHERE` clause can only be used on JSON arrays.",
                ));
            }
        };

        let mut updated = 0usize;
        for item in items.iter_mut() {
            if !where_matches(item, &field, &needle) {
                continue;
            }
            if let Some(obj) = item.as_object_mut() {
                for pair in assignments.chunks_exact(2) {
                    obj.insert(pair[0].clone(), json_or_string(&pair[1]));
                }
                updated += 1;
            }
        }

        if updated == 0 {
            MutateOutcome::Keep(Reply::ok("0"))
        } else {
            MutateOutcome::Replace(doc.to_string(), Reply::ok(updated.to_string()))
        }
    });

    match result {
        MutateResult::Missing => Reply::not_found("(nil)"),
        MutateResult::Done(reply) => reply,
    }
}

fn handle_json_del(store: &Store, args: &[String]) -> Reply {
    match args.len() {
        0 => Reply::bad("-ERR wrong number of arguments"),
        1 => handle_del(store, args),
        2 => handle_json_del_path(store, &args[0], &args[1]),
        4 if args[1] == "WHERE" => handle_json_del_where(store, &args[0], &args[2], &args[3]),
        _ => Reply::bad("-ERR syntax: JSON.DEL <key> [WHERE <field> <value>]"),
    }
}

/// `JSON.DEL key <path>` — remove the value at a path
fn handle_json_del_path(store: &Store, key: &str, path: &str) -> Reply {
    let tokens = json::parse_path(path);
    let result = store.mutate_value(key, |raw| {
        let mut doc: Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(_) => return MutateOutcome::Keep(Reply::internal("-ERR not a valid JSON document")),
        };
        if json::delete(&mut doc, &tokens) {
            MutateOutcome::Replace(doc.to_string(), Reply::ok("1"))
        } else {
            MutateOutcome::Keep(Reply::ok("0"))
        }
    });

    match result {
        MutateResult::Missing => Reply::not_found("(nil)"),
        MutateResult::Done(reply) => reply,
    }
}

/// `JSON.DEL key WHERE field value` — remove every matching array element
fn handle_json_del_where(store: &Store, key: &str, field: &str, raw_value: &str) -> Reply {
    let needle = json_or_string(raw_value);
    let result = store.mutate_value(key, |raw| {
        let mut doc: Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(_) => return MutateOutcome::Keep(Reply::internal("-ERR not a valid JSON document")),
        };
        let items = match doc.as_array_mut() {
            Some(items) => items,
            None => {
                return MutateOutcome::Keep(Reply::bad(
                    "-ERR WHERE clause can only be used on JSON arrays.",
                ));
            }
        };

        let before = items.len();
        items.retain(|item| !where_matches(item, field, &needle));
        let deleted = before - items.len();

        if deleted == 0 {
            MutateOutcome::Keep(Reply::ok("0"))
        } else {
            MutateOutcome::Replace(doc.to_string(), Reply::ok(deleted.to_string()))
        }
    });

    match result {
        MutateResult::Missing => Reply::not_found("(nil)"),
        MutateResult::Done(reply) => reply,
    }
}

fn handle_json_append(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 {
        return Reply::bad(
            "-ERR wrong number of arguments. Syntax: JSON.APPEND <key> '<json_to_append>'",
        );
    }

    let result = store.mutate_value(&args[0], |raw| {
        let mut doc: Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(_) => {
                return MutateOutcome::Keep(Reply::internal(
                    "-ERR value at key is not a valid JSON document",
                ));
            }
        };
        let items = match doc.as_array_mut() {
            Some(items) => items,
            None => {
                return MutateOutcome::Keep(Reply::bad(
                    "-ERR APPEND requires the value at key to be a JSON array",
                ));
            }
        };

        let addition: Value = match serde_json::from_str(&args[1]) {
            Ok(value) => value,
            Err(e) => {
                return MutateOutcome::Keep(Reply::bad(format!("-ERR invalid JSON for append: {e}")));
            }
        };
        match addition {
            Value::Object(_) => items.push(addition),
            Value::Array(elements) => items.extend(elements),
            _ => {
                return MutateOutcome::Keep(Reply::bad(
                    "-ERR append value must be a JSON object or array",
                ));
            }
        }

        let new_len = items.len();
        MutateOutcome::Replace(doc.to_string(), Reply::ok(new_len.to_string()))
    });

    match result {
        MutateResult::Missing => Reply::not_found("(nil)"),
        MutateResult::Done(reply) => reply,
    }
}

fn handle_json_search(store: &Store, args: &[String]) -> Reply {
    if args.len() != 2 && args.len() != 4 {
        return Reply::bad("-ERR syntax: JSON.SEARCH <key> \"<term>\" [MAX <count>]");
    }
    let key = &args[0];
    let term = &args[1];
    if term.is_empty() {
        return Reply::bad("-ERR search term cannot be empty");
    }

    let max_results = if args.len() == 4 {
        if !args[2].eq_ignore_ascii_case("MAX") {
            return Reply::bad("-ERR expected MAX keyword after term");
        }
        match args[3].parse::<i64>() {
            Ok(count) if count > 0 => count as usize,
            Ok(_) => return Reply::bad("-ERR MAX count must be a positive integer"),
            Err(_) => return Reply::bad("-ERR invalid number for MAX count"),
        }
    } else {
        usize::MAX
    };

    let raw = match store.read_value(key) {
        Some(raw) => raw,
        None => return Reply::not_found("(nil)"),
    };
    let doc: Value = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(_) => return Reply::internal("-ERR not a valid JSON document"),
    };

    let mut matches: Vec<Value> = Vec::new();
    match &doc {
        Value::Array(items) => {
            for item in items {
                if matches.len() >= max_results {
                    break;
                }
                if json::contains_word(item, term) {
                    matches.push(item.clone());
                }
            }
        }
        other => {
            if json::contains_word(other, term) {
                matches.push(other.clone());
            }
        }
    }

    if matches.is_empty() {
        return Reply::not_found("(nil)");
    }
    let dump = pretty(&Value::Array(matches));

    if !store.promote(key) {
        return Reply::not_found("(nil)");
    }
    Reply::ok(dump)
}

// =============================================================================
// Admin commands
// =============================================================================

fn handle_stats(store: &Store) -> Reply {
    const RULE: &str = "-------------------------\n";

    let mut out = String::new();
    out.push_str(&format!("Version: NukeKV v{VERSION} \u{2622}\u{fe0f}\n"));
    out.push_str("Protocol: Nuke-Wire (CUSTOM RAW TCP)\n");
    out.push_str(&format!(
        "Debug Mode: {}\n",
        if store.debug_mode() { "ON" } else { "OFF" }
    ));
    out.push_str(&format!("Worker Threads: {}\n", store.worker_threads()));
    out.push_str(RULE);

    out.push_str(&format!(
        "Persistence Disk: {}\n",
        if store.persistence_enabled() {
            "Enabled"
        } else {
            "Disabled"
        }
    ));
    if store.persistence_enabled() {
        out.push_str(&format!("  - Batch Size: {}\n", store.batch_size()));
        out.push_str(&format!("  - Unsaved Ops: {}\n", store.dirty_ops()));
        let disk = persistence::file_size(store.database_path())
            .map(stress::format_memory_size)
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!("  - Disk Size: {disk}\n"));
    }
    out.push_str(RULE);

    out.push_str(&format!(
        "Caching: {}\n",
        if store.caching_enabled() {
            "Enabled"
        } else {
            "Disabled"
        }
    ));
    if store.caching_enabled() {
        let limit = if store.max_memory_bytes() > 0 {
            stress::format_memory_size(store.max_memory_bytes())
        } else {
            "Unlimited".to_string()
        };
        out.push_str(&format!("  - Memory Limit: {limit}\n"));
        out.push_str(&format!(
            "  - Memory Used: {}\n",
            stress::format_memory_size(store.memory_used())
        ));
    }
    out.push_str(RULE);

    out.push_str(&format!("Total Keys: {}\n", store.len()));
    out.push_str(&format!("Keys with TTL: {}\n", store.ttl_count()));
    out.push_str(RULE);

    Reply::ok(out)
}

fn handle_stress(args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR STRESS requires one argument");
    }
    let count = match args[0].parse::<i64>() {
        Ok(count) => count,
        Err(_) => return Reply::bad("-ERR invalid number"),
    };
    if count <= 0 {
        return Reply::bad("-ERR count must be positive");
    }
    Reply::ok(stress::run(count as usize))
}

fn handle_batch(store: &Store, args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR BATCH requires one argument");
    }
    let size = match args[0].parse::<i64>() {
        Ok(size) => size,
        Err(_) => return Reply::bad("-ERR value is not an integer"),
    };
    if size < 0 {
        return Reply::bad("-ERR batch size cannot be negative");
    }
    store.set_batch_size(size as u64);
    Reply::ok("+OK")
}

fn handle_debug(store: &Store, args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR DEBUG requires one argument");
    }
    if args[0].eq_ignore_ascii_case("true") {
        store.set_debug_mode(true);
        Reply::ok("+OK Debug mode enabled.")
    } else if args[0].eq_ignore_ascii_case("false") {
        store.set_debug_mode(false);
        Reply::ok("+OK Debug mode disabled.")
    } else {
        Reply::bad("-ERR Invalid argument. Use 'true' or 'false'.")
    }
}

fn handle_clrdb(store: &Store) -> Reply {
    let cleared = store.clear();
    Reply::ok(format!("+OK {cleared} keys cleared."))
}

fn handle_similar(store: &Store, args: &[String]) -> Reply {
    if args.len() != 1 {
        return Reply::bad("-ERR wrong number of arguments, expected: SIMILAR <prefix>");
    }
    if args[0].is_empty() {
        return Reply::bad("-ERR prefix cannot be empty");
    }
    Reply::ok(store.prefix_count(&args[0]).to_string())
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Parse the optional `EX <seconds>` tail of SET / JSON.SET argv
fn parse_ex_tail(args: &[String]) -> Result<Option<i64>, Reply> {
    if args.len() != 4 {
        return Ok(None);
    }
    if !args[2].eq_ignore_ascii_case("EX") {
        return Ok(None);
    }
    match args[3].parse::<i64>() {
        Ok(seconds) => Ok(Some(seconds)),
        Err(_) => Err(Reply::bad("-ERR value is not an integer")),
    }
}

/// WHERE operands parse as JSON when possible, else as raw strings
fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Does an array element satisfy `field == value`?
fn where_matches(item: &Value, field: &str, needle: &Value) -> bool {
    item.as_object()
        .and_then(|obj| obj.get(field))
        .is_some_and(|found| found == needle)
}

/// 2-space-indent rendering for document replies
fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
