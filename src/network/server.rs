//! TCP Server
//!
//! Accepts connections and spawns one handler thread per client.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{NukeError, Result};
use crate::network::connection;

/// TCP server for NukeKV
///
/// ## Architecture
/// - The acceptor polls a non-blocking listener so it can observe the
///   shutdown flag between accepts
/// - Each accepted socket gets its own named handler thread
/// - Handler threads share the engine; the acceptor holds no store state
pub struct Server {
    engine: Arc<Engine>,

    /// TCP listener (created on bind)
    listener: Option<TcpListener>,

    /// Shutdown flag, shared with the signal handler
    shutdown: Arc<AtomicBool>,

    /// Active connection count (diagnostics)
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adopt a listener bound before the engine came up (the bootstrap
    /// binds first so a taken port fails fast, before any snapshot load)
    pub fn with_listener(engine: Arc<Engine>, listener: TcpListener) -> Result<Self> {
        listener.set_nonblocking(true)?;
        let mut server = Self::new(engine);
        server.listener = Some(listener);
        Ok(server)
    }

    /// Bind the listening socket and return the bound address. Binding
    /// through the standard listener sets SO_REUSEADDR on Unix.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let addr = self.engine.config().listen_addr();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| NukeError::Network(format!("failed to bind to {addr}: {e}")))?;
        listener.set_nonblocking(true)?;

        let local = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local)
    }

    /// Accept loop; returns when the shutdown flag is raised
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = self.listener.as_ref().unwrap();

        tracing::info!(addr = %listener.local_addr()?, "server listening");

        let mut next_conn_id: u64 = 0;
        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!(%addr, "accepted connection");
                    next_conn_id += 1;
                    if let Err(e) = self.spawn_handler(stream, next_conn_id) {
                        tracing::error!(error = %e, "failed to spawn connection handler");
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections; nap and re-check shutdown.
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        tracing::error!(error = %e, "accept error");
                    }
                }
            }
        }

        tracing::info!("accept loop stopped");
        Ok(())
    }

    fn spawn_handler(&self, stream: TcpStream, conn_id: u64) -> Result<()> {
        // The listener is non-blocking; accepted sockets must not be.
        stream.set_nonblocking(false)?;

        let engine = Arc::clone(&self.engine);
        let gauge = Arc::clone(&self.active_connections);
        gauge.fetch_add(1, Ordering::Relaxed);

        thread::Builder::new()
            .name(format!("nukekv-conn-{conn_id}"))
            .spawn(move || {
                connection::handle(stream, engine);
                gauge.fetch_sub(1, Ordering::Relaxed);
            })?;
        Ok(())
    }

    /// Handle the signal handler flips to stop the accept loop
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to stop accepting
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bound address, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}
