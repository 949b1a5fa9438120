use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use sled::{Db, Tree};

use crate::broker::message::Message;
use crate::utils::error::Result;

/// Handle on the embedded database. One `Store` serves every queue of a
/// broker; each queue gets its own tree.
#[derive(Clone)]
pub struct Store {
    db: Db,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Opens (or creates) the tree backing the named queue.
    pub fn queue_store(&self, queue: &str) -> Result<QueueStore> {
        QueueStore::open(&self.db, queue)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("db", &"sled::Db").finish()
    }
}

/// Durable backing for a single queue.
///
/// Messages are keyed by a monotonically increasing sequence number, so
/// iteration order is enqueue order. In-flight bookkeeping is not
/// persisted: after a restart every stored message is visible again,
/// which is exactly the at-least-once contract.
pub struct QueueStore {
    tree: Tree,
    next_seq: AtomicU64,
}

impl QueueStore {
    fn open(db: &Db, queue: &str) -> Result<Self> {
        let tree = db.open_tree(queue)?;
        let next_seq = match tree.last()? {
            Some((key, _)) => decode_seq(&key).map_or(0, |seq| seq + 1),
            None => 0,
        };
        Ok(Self {
            tree,
            next_seq: AtomicU64::new(next_seq),
        })
    }

    /// Persists a message and returns its sequence key.
    pub fn append(&self, message: &Message) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let bytes = serde_json::to_vec(message)?;
        self.tree.insert(seq.to_be_bytes(), bytes)?;
        Ok(seq)
    }

    /// Drops a message from the store once it has been acknowledged.
    pub fn remove(&self, seq: u64) -> Result<()> {
        self.tree.remove(seq.to_be_bytes())?;
        Ok(())
    }

    /// Loads every persisted message in sequence order.
    pub fn load(&self) -> Result<Vec<(u64, Message)>> {
        let mut messages = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let Some(seq) = decode_seq(&key) else { continue };
            let message = serde_json::from_slice(&value)?;
            messages.push((seq, message));
        }
        Ok(messages)
    }
}

fn decode_seq(key: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}
