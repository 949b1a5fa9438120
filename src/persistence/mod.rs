//! The `persistence` module provides the durable backing for queues.
//!
//! Queues must keep their messages across worker restarts, so every
//! enqueued message is written to an embedded `sled` store and removed
//! again when the consumer acknowledges it. On startup a queue reloads
//! whatever the store still holds.

pub mod sled_store;

pub use sled_store::{QueueStore, Store};
