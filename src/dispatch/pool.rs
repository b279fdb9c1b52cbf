//! Worker pool
//!
//! A single bounded FIFO queue drained by N worker threads. Each task
//! carries its argv and a one-shot completion channel the connection loop
//! blocks on. Shutdown messages are enqueued behind any pending tasks, so
//! draining the pool completes every task that was submitted before the
//! stop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::Result;
use crate::store::Store;

use super::handlers::{self, Reply};

/// Pending commands the queue will hold before submitters block
const TASK_QUEUE_DEPTH: usize = 1024;

/// One queued command
pub struct Task {
    pub command: String,
    pub args: Vec<String>,

    /// One-shot reply channel; the connection owns the receiver
    pub completion: Sender<Reply>,
}

enum WorkerMessage {
    Task(Task),
    Shutdown,
}

/// The worker thread pool
pub struct WorkerPool {
    sender: Sender<WorkerMessage>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl WorkerPool {
    /// Spawn `num_workers` threads draining a fresh queue
    pub fn start(store: Arc<Store>, num_workers: usize) -> Result<Self> {
        let (sender, receiver) = bounded::<WorkerMessage>(TASK_QUEUE_DEPTH);

        let mut workers = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let worker = Worker {
                id: worker_id,
                receiver: receiver.clone(),
                store: Arc::clone(&store),
            };
            let handle = thread::Builder::new()
                .name(format!("nukekv-worker-{worker_id}"))
                .spawn(move || worker.run())?;
            workers.push(handle);
        }

        Ok(Self {
            sender,
            workers: Mutex::new(workers),
            stopped: AtomicBool::new(false),
        })
    }

    /// Queue a command and hand back its completion receiver. A task
    /// submitted after shutdown is rejected: its completion sender drops
    /// here, so the receiver observes disconnection instead of hanging.
    pub fn dispatch(&self, command: String, args: Vec<String>) -> Receiver<Reply> {
        let (completion, receiver) = bounded(1);
        if self.stopped.load(Ordering::Relaxed) {
            tracing::warn!(%command, "task submitted after worker pool shutdown");
            return receiver;
        }
        let task = Task {
            command,
            args,
            completion,
        };
        let _ = self.sender.send(WorkerMessage::Task(task));
        receiver
    }

    /// Drain the queue and join every worker
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        let mut workers = self.workers.lock();
        for _ in 0..workers.len() {
            // Lands behind all pending tasks; workers finish those first.
            let _ = self.sender.send(WorkerMessage::Shutdown);
        }
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked during shutdown");
            }
        }
    }
}

/// One worker thread
struct Worker {
    id: usize,
    receiver: Receiver<WorkerMessage>,
    store: Arc<Store>,
}

impl Worker {
    fn run(self) {
        tracing::debug!("worker {} started", self.id);

        loop {
            match self.receiver.recv() {
                Ok(WorkerMessage::Task(task)) => self.run_task(task),
                Ok(WorkerMessage::Shutdown) | Err(_) => break,
            }
        }

        tracing::debug!("worker {} stopped", self.id);
    }

    fn run_task(&self, task: Task) {
        let reply = match panic::catch_unwind(AssertUnwindSafe(|| {
            handlers::execute(&self.store, &task.command, &task.args)
        })) {
            Ok(reply) => reply,
            Err(payload) => {
                let message = panic_message(&payload);
                tracing::error!(command = %task.command, %message, "handler panicked");
                Reply::internal(format!("-ERR worker exception: {message}"))
            }
        };

        // The connection may have gone away; a dead receiver is not an error.
        let _ = task.completion.send(reply);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown worker exception".to_string()
    }
}
