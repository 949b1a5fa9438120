use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::utils::error::Error;

use super::message::Message;
use super::queue::{Queue, spawn_reaper};

/// Failure reported by a handler. The worker does not inspect it beyond
/// logging; the message is redelivered after its visibility timeout.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Per-message consumer logic.
///
/// Implementations must tolerate seeing the same message more than once:
/// redelivery after a visibility timeout is part of the contract.
pub trait Handler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self(message)
    }
}

/// Polling parameters for one worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub visibility_timeout: Duration,
    /// How long to sleep after an empty receive before polling again.
    pub poll_backoff: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            visibility_timeout: Duration::from_secs(30),
            poll_backoff: Duration::from_millis(200),
        }
    }
}

/// Drains one queue in batches and acknowledges every message its handler
/// accepts.
///
/// A worker holds a reference to its own queue and nothing else; receive
/// and delete on that queue are the only operations it can reach. Handler
/// failure is not an error path here: the message is simply left in flight
/// until its visibility timeout requeues it.
pub struct Worker {
    queue: Arc<Queue>,
    handler: Arc<dyn Handler>,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        queue: Arc<Queue>,
        handler: Arc<dyn Handler>,
        settings: WorkerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            handler,
            settings,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll loop. Exits once shutdown is signalled: the batch in progress
    /// is finished first, and anything still in flight times out back to
    /// visible for the next worker generation. No message is dropped.
    pub async fn run(mut self) {
        info!(queue = self.queue.name(), "worker started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let batch = self
                .queue
                .receive(self.settings.batch_size, self.settings.visibility_timeout);
            if batch.is_empty() {
                tokio::select! {
                    _ = self.shutdown.changed() => {}
                    _ = tokio::time::sleep(self.settings.poll_backoff) => {}
                }
                continue;
            }

            debug!(queue = self.queue.name(), count = batch.len(), "received batch");
            for message in batch {
                match self.handler.handle(&message) {
                    Ok(()) => match self.queue.delete(message.id) {
                        Ok(()) => {}
                        Err(Error::MessageNotInFlight { .. }) => {
                            // late ack raced the reaper; the message stays
                            // deliverable
                            debug!(
                                queue = self.queue.name(),
                                id = %message.id,
                                "acknowledgement raced visibility timeout"
                            );
                        }
                        Err(err) => {
                            warn!(
                                queue = self.queue.name(),
                                id = %message.id,
                                error = %err,
                                "failed to delete acknowledged message"
                            );
                        }
                    },
                    Err(err) => {
                        warn!(
                            queue = self.queue.name(),
                            id = %message.id,
                            error = %err,
                            "handler failed, message will be redelivered"
                        );
                    }
                }
            }
        }
        info!(queue = self.queue.name(), "worker stopped");
    }
}

/// Owns the shutdown signal and the join handles for a set of workers and
/// reapers.
pub struct WorkerSet {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerSet {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn spawn_worker(
        &mut self,
        queue: Arc<Queue>,
        handler: Arc<dyn Handler>,
        settings: WorkerSettings,
    ) {
        let worker = Worker::new(queue, handler, settings, self.shutdown.subscribe());
        self.handles.push(worker.spawn());
    }

    pub fn spawn_reaper(&mut self, queue: Arc<Queue>, every: Duration) {
        self.handles
            .push(spawn_reaper(queue, every, self.shutdown.subscribe()));
    }

    /// Signals shutdown and waits for every task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl Default for WorkerSet {
    fn default() -> Self {
        Self::new()
    }
}
