use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use uuid::Uuid;

use crate::persistence::QueueStore;
use crate::utils::error::{Error, Result};

use super::message::Message;

/// A message plus its durable sequence key. The key is `None` for queues
/// running without a store.
struct Entry {
    seq: Option<u64>,
    message: Message,
}

struct InFlight {
    entry: Entry,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    visible: VecDeque<Entry>,
    in_flight: HashMap<Uuid, InFlight>,
    /// Ids currently owned by the queue, visible or in flight. Makes
    /// re-enqueueing the same message a cheap no-op.
    live: HashSet<Uuid>,
}

/// Per-subscriber buffer with visibility-based at-least-once delivery.
///
/// Invariant: until a message is deleted, its id lives in exactly one of
/// `visible` or `in_flight`, never both. All state sits behind a single
/// per-queue mutex; critical sections touch at most a batch of entries at
/// a time, and different queues share nothing.
///
/// Ordering within a queue is best-effort FIFO: a message whose visibility
/// timeout elapsed goes to the back of the visible queue, behind messages
/// enqueued while it was in flight.
pub struct Queue {
    name: String,
    store: Option<QueueStore>,
    state: Mutex<QueueState>,
}

impl Queue {
    /// A queue without durable backing. Mostly useful in tests and for
    /// embedding callers that do not need messages to outlive the process.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: None,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// A durable queue. Messages persisted by a previous process generation
    /// are loaded back as visible, in their original enqueue order.
    pub fn durable(name: impl Into<String>, store: QueueStore) -> Result<Self> {
        let mut state = QueueState::default();
        for (seq, message) in store.load()? {
            state.live.insert(message.id);
            state.visible.push_back(Entry {
                seq: Some(seq),
                message,
            });
        }
        Ok(Self {
            name: name.into(),
            store: Some(store),
            state: Mutex::new(state),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visible_len(&self) -> usize {
        self.state().visible.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state().in_flight.len()
    }

    /// Appends a message to the visible queue.
    ///
    /// Enqueueing an id the queue already owns is a no-op, which is what
    /// makes the fan-out retry in the broker safe to repeat.
    pub fn enqueue(&self, message: Message) -> Result<()> {
        let mut state = self.state();
        if !state.live.insert(message.id) {
            debug!(queue = %self.name, id = %message.id, "message already queued");
            return Ok(());
        }
        let seq = match &self.store {
            Some(store) => match store.append(&message) {
                Ok(seq) => Some(seq),
                Err(err) => {
                    state.live.remove(&message.id);
                    return Err(err);
                }
            },
            None => None,
        };
        state.visible.push_back(Entry { seq, message });
        Ok(())
    }

    /// Atomically moves up to `batch_size` messages in flight and returns
    /// them. An empty result means nothing is currently ready; it is not an
    /// error. Expired in-flight entries are requeued first, so a single
    /// poller sees redeliveries without a background reaper.
    pub fn receive(&self, batch_size: usize, visibility_timeout: Duration) -> Vec<Message> {
        let now = Instant::now();
        let mut state = self.state();
        requeue_expired(&mut state, now);

        let mut batch = Vec::new();
        while batch.len() < batch_size {
            let Some(entry) = state.visible.pop_front() else {
                break;
            };
            let message = entry.message.clone();
            state.in_flight.insert(
                message.id,
                InFlight {
                    entry,
                    deadline: now + visibility_timeout,
                },
            );
            batch.push(message);
        }
        batch
    }

    /// Acknowledges an in-flight message, removing it permanently.
    ///
    /// If the message is not in flight (already deleted, or its visibility
    /// elapsed and it was requeued) this returns
    /// [`Error::MessageNotInFlight`] and leaves the queue untouched. A late
    /// acknowledgement racing the reaper lands here.
    pub fn delete(&self, message_id: Uuid) -> Result<()> {
        let mut state = self.state();
        let Some(record) = state.in_flight.remove(&message_id) else {
            return Err(Error::MessageNotInFlight {
                queue: self.name.clone(),
                message_id,
            });
        };
        state.live.remove(&message_id);
        if let (Some(store), Some(seq)) = (&self.store, record.entry.seq) {
            store.remove(seq)?;
        }
        Ok(())
    }

    /// Returns every expired in-flight message to the back of the visible
    /// queue. Called inline by `receive` and periodically by the reaper
    /// task. Returns how many messages were requeued.
    pub fn reap_expired(&self) -> usize {
        let mut state = self.state();
        requeue_expired(&mut state, Instant::now())
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().expect("queue state poisoned")
    }
}

fn requeue_expired(state: &mut QueueState, now: Instant) -> usize {
    let expired: Vec<Uuid> = state
        .in_flight
        .iter()
        .filter(|(_, record)| record.deadline <= now)
        .map(|(id, _)| *id)
        .collect();
    for id in &expired {
        if let Some(record) = state.in_flight.remove(id) {
            state.visible.push_back(record.entry);
        }
    }
    expired.len()
}

/// Spawns the background reaper for one queue. The task wakes every
/// `every` and requeues expired deliveries until shutdown is signalled.
/// This is the sole redelivery mechanism; there is no retry counter and no
/// dead-letter routing.
pub fn spawn_reaper(
    queue: Arc<Queue>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let requeued = queue.reap_expired();
                    if requeued > 0 {
                        debug!(queue = queue.name(), requeued, "visibility timeout elapsed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}
