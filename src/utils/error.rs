//! The `error` module defines the error type shared by the broker, its
//! queues and the persistence layer.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by broker and queue operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("topic not found: `{0}`")]
    TopicNotFound(String),

    #[error("queue not found: `{0}`")]
    QueueNotFound(String),

    /// The message is not in flight on this queue. Either it was already
    /// deleted, or its visibility timeout elapsed and it went back to the
    /// visible queue before the acknowledgement arrived.
    #[error("message {message_id} is not in flight on queue `{queue}`")]
    MessageNotInFlight { queue: String, message_id: Uuid },

    /// Fan-out could not hand a copy of the message to one of the matching
    /// queues, even after retrying the enqueue.
    #[error("delivery to queue `{queue}` failed after {attempts} attempts")]
    Delivery {
        queue: String,
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
