//! Connection handler
//!
//! The per-connection loop: unframe a command, parse it, run the PING/QUIT
//! fast paths, otherwise submit a task and block on its completion. The
//! reply is framed back on the same socket. Any framing violation closes
//! the connection without a reply.

use std::io::BufReader;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::{format_duration, Reply};
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{parse_command_line, read_message, write_message};

/// Serve one client until it disconnects or violates the protocol
pub fn handle(stream: TcpStream, engine: Arc<Engine>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    if let Err(e) = serve(stream, &engine) {
        tracing::debug!(%peer, error = %e, "connection ended with error");
    } else {
        tracing::debug!(%peer, "connection closed");
    }
}

fn serve(stream: TcpStream, engine: &Arc<Engine>) -> Result<()> {
    let max_payload = engine.config().max_payload_size;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    loop {
        let body = match read_message(&mut reader, max_payload)? {
            Some(body) => body,
            None => return Ok(()),
        };
        let line = String::from_utf8_lossy(&body).into_owned();

        let started = Instant::now();
        let mut argv = parse_command_line(&line);

        let reply = if argv.is_empty() {
            Reply::bad("-ERR empty command")
        } else {
            let command = argv.remove(0).to_ascii_uppercase();
            match command.as_str() {
                "QUIT" => {
                    write_message(&mut writer, b"+OK Bye")?;
                    return Ok(());
                }
                "PING" => Reply::ok("+PONG"),
                _ => {
                    let completion = engine.dispatch(command, argv);
                    match completion.recv() {
                        Ok(reply) => reply,
                        // A stopped pool rejects the task by dropping the
                        // completion sender unsent.
                        Err(_) => Reply::internal("-ERR server is shutting down"),
                    }
                }
            }
        };

        let mut text = reply.text;
        if engine.store().debug_mode() && !text.starts_with("Stress Test") {
            let elapsed = started.elapsed().as_secs_f64();
            text.push_str(&format!(" ({})", format_duration(elapsed)));
        }

        write_message(&mut writer, text.as_bytes())?;
    }
}
