//! NukeKV Interactive Client
//!
//! A thin line client over the nuke-wire framing: read a line, send it as
//! one frame, print the reply frame. No command knowledge lives here.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;

use clap::Parser;

use nukekv::config::DEFAULT_MAX_PAYLOAD_SIZE;
use nukekv::protocol::{read_message, write_message};

/// NukeKV CLI
#[derive(Parser, Debug)]
#[command(name = "nukekv-cli")]
#[command(about = "Interactive client for a NukeKV server")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: String,
}

fn main() {
    let args = Args::parse();

    let stream = match TcpStream::connect(&args.addr) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("could not connect to {}: {e}", args.addr);
            process::exit(1);
        }
    };
    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("connection setup failed: {e}");
            process::exit(1);
        }
    };
    let mut reader = BufReader::new(stream);

    println!("Connected to NukeKV at {}. Type QUIT to exit.", args.addr);

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("nukekv> ");
        let _ = io::stdout().flush();

        input.clear();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }
        let line = input.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        if write_message(&mut writer, line.as_bytes()).is_err() {
            eprintln!("(connection lost)");
            break;
        }
        match read_message(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE) {
            Ok(Some(reply)) => println!("{}", String::from_utf8_lossy(&reply)),
            _ => {
                eprintln!("(connection closed by server)");
                break;
            }
        }

        if line.eq_ignore_ascii_case("quit") {
            break;
        }
    }
}
