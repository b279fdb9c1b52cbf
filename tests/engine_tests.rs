//! Engine tests
//!
//! Dispatch through the worker pool, ordering, concurrent correctness, and
//! the persistence lifecycle across engine restarts.

use std::sync::Arc;
use std::thread;

use nukekv::{Config, Engine};
use tempfile::TempDir;

fn ephemeral_engine() -> Engine {
    let config = Config::builder().persistence_enabled(false).build();
    Engine::open(config).unwrap()
}

fn run(engine: &Engine, command: &str, args: &[&str]) -> String {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    engine
        .dispatch(command.to_string(), args)
        .recv()
        .expect("worker delivered a reply")
        .text
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_roundtrip() {
    let engine = ephemeral_engine();
    assert_eq!(run(&engine, "SET", &["a", "hello"]), "+OK");
    assert_eq!(run(&engine, "GET", &["a"]), "hello");
    engine.close();
}

#[test]
fn test_serial_dispatch_observes_prior_commands() {
    let engine = ephemeral_engine();
    // Awaiting each completion before the next dispatch gives per-client
    // ordering; every reply reflects all earlier commands.
    for i in 0..50 {
        assert_eq!(run(&engine, "INCR", &["n"]), (i + 1).to_string());
    }
    assert_eq!(run(&engine, "GET", &["n"]), "50");
    engine.close();
}

#[test]
fn test_unknown_command_via_pool() {
    let engine = ephemeral_engine();
    assert_eq!(run(&engine, "BOGUS", &[]), "-ERR unknown command 'BOGUS'");
    engine.close();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_disjoint_keys_keep_their_values() {
    let engine = Arc::new(ephemeral_engine());

    let handles: Vec<_> = (0..8)
        .map(|client| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("c{client}:k{i}");
                    let value = format!("v{client}:{i}");
                    assert_eq!(run(&engine, "SET", &[&key, &value]), "+OK");
                    assert_eq!(run(&engine, "GET", &[&key]), value);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.store().len(), 8 * 50);
    engine.close();
}

#[test]
fn test_shared_counter_has_no_lost_updates() {
    let engine = Arc::new(ephemeral_engine());
    const CLIENTS: usize = 8;
    const INCREMENTS: usize = 100;

    let handles: Vec<_> = (0..CLIENTS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    run(&engine, "INCR", &["shared"]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        run(&engine, "GET", &["shared"]),
        (CLIENTS * INCREMENTS).to_string()
    );
    engine.close();
}

// =============================================================================
// Persistence Lifecycle Tests
// =============================================================================

#[test]
fn test_snapshot_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nukekv.db");

    // Phase 1: write-through engine, then a graceful close.
    {
        let config = Config::builder()
            .database_path(&db)
            .batch_processing_size(0)
            .build();
        let engine = Engine::open(config).unwrap();

        run(&engine, "SET", &["user:1", "Alice"]);
        run(&engine, "SET", &["user:2", "Bob"]);
        run(&engine, "INCR", &["visits", "7"]);
        run(&engine, "DEL", &["user:2"]);
        engine.close();
    }

    // Phase 2: reopen and verify.
    {
        let config = Config::builder().database_path(&db).build();
        let engine = Engine::open(config).unwrap();

        assert_eq!(run(&engine, "GET", &["user:1"]), "Alice");
        assert_eq!(run(&engine, "GET", &["user:2"]), "(nil)");
        assert_eq!(run(&engine, "GET", &["visits"]), "7");
        engine.close();
    }
}

#[test]
fn test_close_saves_unsaved_operations() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nukekv.db");

    {
        // Batch threshold high enough that nothing saves mid-run.
        let config = Config::builder()
            .database_path(&db)
            .batch_processing_size(10_000)
            .build();
        let engine = Engine::open(config).unwrap();
        run(&engine, "SET", &["k", "v"]);
        assert!(engine.store().dirty_ops() > 0);
        engine.close();
    }
    assert!(db.exists(), "shutdown flushed the dirty store");

    {
        let config = Config::builder().database_path(&db).build();
        let engine = Engine::open(config).unwrap();
        assert_eq!(run(&engine, "GET", &["k"]), "v");
        engine.close();
    }
}

#[test]
fn test_expired_keys_do_not_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nukekv.db");

    {
        let config = Config::builder()
            .database_path(&db)
            .batch_processing_size(0)
            .build();
        let engine = Engine::open(config).unwrap();
        run(&engine, "SET", &["stale", "v", "EX", "-1"]);
        run(&engine, "SET", &["fresh", "v", "EX", "10000"]);
        engine.close();
    }

    {
        let config = Config::builder().database_path(&db).build();
        let engine = Engine::open(config).unwrap();
        assert_eq!(run(&engine, "GET", &["stale"]), "(nil)");
        assert_eq!(run(&engine, "GET", &["fresh"]), "v");
        engine.close();
    }
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nukekv.db");
    std::fs::write(&db, b"{definitely not json").unwrap();

    let config = Config::builder().database_path(&db).build();
    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.store().len(), 0);
    assert_eq!(run(&engine, "GET", &["anything"]), "(nil)");
    engine.close();
}

#[test]
fn test_stress_does_not_touch_snapshot() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nukekv.db");

    let config = Config::builder()
        .database_path(&db)
        .batch_processing_size(0)
        .build();
    let engine = Engine::open(config).unwrap();

    run(&engine, "SET", &["live", "data"]);
    let on_disk = std::fs::read_to_string(&db).unwrap();

    run(&engine, "STRESS", &["1000"]);
    assert_eq!(std::fs::read_to_string(&db).unwrap(), on_disk);
    assert_eq!(engine.store().len(), 1);
    engine.close();
}
