use std::collections::HashMap;

use uuid::Uuid;

use super::filter::FilterPolicy;

/// One topic-to-queue binding with its filter policy.
///
/// Subscriptions are created when the registry is built and never change
/// for the life of the broker. Exactly one subscription binds one topic to
/// one queue.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub topic: String,
    pub queue: String,
    pub filter: FilterPolicy,
}

/// Topic-to-subscription bindings.
///
/// Built once at startup and read-only afterwards, so the publish path
/// reads it without any locking.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: HashMap<String, Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a topic with no subscriptions yet. Publishing to such a
    /// topic succeeds and simply drops the message.
    pub fn register_topic(&mut self, topic: &str) {
        self.topics.entry(topic.to_string()).or_default();
    }

    /// Binds `queue` to `topic` under `filter` and returns the new
    /// subscription's id. The topic is registered if it was not yet known.
    pub fn bind(&mut self, topic: &str, queue: &str, filter: FilterPolicy) -> Uuid {
        let id = Uuid::new_v4();
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscription {
                id,
                topic: topic.to_string(),
                queue: queue.to_string(),
                filter,
            });
        id
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// All subscriptions bound to `topic`, or `None` for an unknown topic.
    pub fn subscriptions_for(&self, topic: &str) -> Option<&[Subscription]> {
        self.topics.get(topic).map(Vec::as_slice)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}
