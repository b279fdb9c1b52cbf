//! End-to-end tests over a real TCP socket
//!
//! Brings up the full server (engine + accept loop) on an ephemeral port
//! and talks nuke-wire to it.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nukekv::network::Server;
use nukekv::protocol::{read_message, write_message};
use nukekv::{Config, Engine};

struct TestServer {
    engine: Arc<Engine>,
    addr: std::net::SocketAddr,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
    _dir: tempfile::TempDir,
}

fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::builder()
        .bind("127.0.0.1")
        .port(0)
        .database_path(dir.path().join("nukekv.db"))
        .persistence_enabled(false)
        .build();

    let engine = Arc::new(Engine::open(config).unwrap());
    let mut server = Server::new(Arc::clone(&engine));
    let addr = server.bind().unwrap();
    let shutdown = server.shutdown_handle();

    thread::spawn(move || {
        let _ = server.run();
    });

    TestServer {
        engine,
        addr,
        shutdown,
        _dir: dir,
    }
}

impl TestServer {
    fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).unwrap()
    }

    fn stop(self) {
        self.shutdown
            .store(true, std::sync::atomic::Ordering::Relaxed);
        self.engine.close();
    }
}

/// Send one command and read one reply on an open connection
fn roundtrip(stream: &mut TcpStream, command: &str) -> Option<String> {
    write_message(stream, command.as_bytes()).unwrap();
    read_message(stream, 1024 * 1024)
        .unwrap()
        .map(|body| String::from_utf8_lossy(&body).into_owned())
}

// =============================================================================
// Wire Tests
// =============================================================================

#[test]
fn test_ping_and_basic_lifecycle() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(roundtrip(&mut conn, "PING").as_deref(), Some("+PONG"));
    assert_eq!(
        roundtrip(&mut conn, "SET a \"hello\"").as_deref(),
        Some("+OK")
    );
    assert_eq!(roundtrip(&mut conn, "GET a").as_deref(), Some("hello"));
    assert_eq!(roundtrip(&mut conn, "DEL a").as_deref(), Some("1"));
    assert_eq!(roundtrip(&mut conn, "GET a").as_deref(), Some("(nil)"));

    server.stop();
}

#[test]
fn test_replies_arrive_in_issue_order() {
    let server = start_server();
    let mut conn = server.connect();

    for i in 1..=20 {
        assert_eq!(
            roundtrip(&mut conn, "INCR counter").as_deref(),
            Some(i.to_string().as_str())
        );
    }

    server.stop();
}

#[test]
fn test_empty_command_reply() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(
        roundtrip(&mut conn, "").as_deref(),
        Some("-ERR empty command")
    );

    server.stop();
}

#[test]
fn test_quit_says_bye_and_closes() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(roundtrip(&mut conn, "QUIT").as_deref(), Some("+OK Bye"));
    // The server closed its side; the next read sees EOF.
    assert!(read_message(&mut conn, 1024).unwrap().is_none());

    server.stop();
}

#[test]
fn test_oversized_header_closes_without_reply() {
    let server = start_server();
    let mut conn = server.connect();

    // A scanner-style header: 8 bytes that decode to an enormous length.
    conn.write_all(&u64::MAX.to_be_bytes()).unwrap();
    conn.write_all(b"GET / HTTP/1.1").unwrap();
    conn.flush().unwrap();

    assert!(read_message(&mut conn, 1024).unwrap().is_none());

    // Other connections are unaffected.
    let mut fresh = server.connect();
    assert_eq!(roundtrip(&mut fresh, "PING").as_deref(), Some("+PONG"));

    server.stop();
}

#[test]
fn test_unknown_command_over_wire() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(
        roundtrip(&mut conn, "WIBBLE now").as_deref(),
        Some("-ERR unknown command 'WIBBLE'")
    );

    server.stop();
}

#[test]
fn test_command_names_are_case_insensitive() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(roundtrip(&mut conn, "set a \"x\"").as_deref(), Some("+OK"));
    assert_eq!(roundtrip(&mut conn, "get a").as_deref(), Some("x"));
    assert_eq!(roundtrip(&mut conn, "ping").as_deref(), Some("+PONG"));

    server.stop();
}

#[test]
fn test_json_commands_over_wire() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(
        roundtrip(&mut conn, r#"JSON.SET p '[{"id":1,"s":5},{"id":2,"s":7}]'"#).as_deref(),
        Some("+OK")
    );
    assert_eq!(
        roundtrip(&mut conn, "JSON.UPDATE p WHERE id 2 SET s 9").as_deref(),
        Some("1")
    );

    let filtered = roundtrip(&mut conn, "JSON.GET p WHERE id 2").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&filtered).unwrap();
    assert_eq!(parsed, serde_json::json!([{"id": 2, "s": 9}]));

    server.stop();
}

#[test]
fn test_debug_mode_appends_duration() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(
        roundtrip(&mut conn, "DEBUG true").as_deref(),
        Some("+OK Debug mode enabled.")
    );
    let reply = roundtrip(&mut conn, "PING").unwrap();
    assert!(reply.starts_with("+PONG ("), "got: {reply}");
    assert!(reply.ends_with(')'));

    server.stop();
}

#[test]
fn test_parallel_connections_make_progress() {
    let server = start_server();

    let addr = server.addr;
    let handles: Vec<_> = (0..4)
        .map(|client| {
            thread::spawn(move || {
                let mut conn = TcpStream::connect(addr).unwrap();
                for i in 0..25 {
                    let set = format!("SET c{client}:k{i} \"v{i}\"");
                    assert_eq!(roundtrip(&mut conn, &set).as_deref(), Some("+OK"));
                    let get = format!("GET c{client}:k{i}");
                    assert_eq!(
                        roundtrip(&mut conn, &get).as_deref(),
                        Some(format!("v{i}").as_str())
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.engine.store().len(), 100);
    server.stop();
}

#[test]
fn test_ttl_expiry_end_to_end() {
    let server = start_server();
    let mut conn = server.connect();

    assert_eq!(
        roundtrip(&mut conn, "SET k \"v\" EX 1").as_deref(),
        Some("+OK")
    );
    assert_eq!(roundtrip(&mut conn, "GET k").as_deref(), Some("v"));
    let ttl: i64 = roundtrip(&mut conn, "TTL k").unwrap().parse().unwrap();
    assert!(ttl >= 0);

    thread::sleep(Duration::from_millis(1200));
    assert_eq!(roundtrip(&mut conn, "GET k").as_deref(), Some("(nil)"));
    assert_eq!(roundtrip(&mut conn, "TTL k").as_deref(), Some("(nil)"));

    server.stop();
}
