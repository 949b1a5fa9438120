use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::persistence::Store;
use crate::utils::error::{Error, Result};

use super::filter::FilterPolicy;
use super::message::{AttributeValue, Message};
use super::queue::Queue;
use super::registry::SubscriptionRegistry;

/// How often the fan-out path retries a failed enqueue before the publish
/// is reported as failed.
const ENQUEUE_ATTEMPTS: usize = 3;

/// Ties the subscription registry to the per-subscriber queues and runs
/// the fan-out on every publish.
///
/// The registry and the queue set are fixed at construction time. Publish
/// may be called concurrently from any number of producers; the only
/// mutable state it touches is inside the individual queues.
pub struct Broker {
    registry: SubscriptionRegistry,
    queues: HashMap<String, Arc<Queue>>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("registry", &self.registry)
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Broker {
    /// Builds a broker over an already-populated registry and queue set.
    /// Every subscription must reference a queue from the set.
    pub fn new(registry: SubscriptionRegistry, queues: Vec<Arc<Queue>>) -> Result<Self> {
        let queues: HashMap<String, Arc<Queue>> = queues
            .into_iter()
            .map(|queue| (queue.name().to_string(), queue))
            .collect();
        for topic in registry.topics() {
            for subscription in registry.subscriptions_for(topic).unwrap_or(&[]) {
                if !queues.contains_key(&subscription.queue) {
                    return Err(Error::QueueNotFound(subscription.queue.clone()));
                }
            }
        }
        Ok(Self { registry, queues })
    }

    /// Builds the registry, the durable queues and the bindings declared
    /// in the settings. Called once at startup.
    pub fn from_settings(settings: &Settings, store: &Store) -> Result<Self> {
        let mut registry = SubscriptionRegistry::new();
        registry.register_topic(&settings.broker.topic);

        let mut queues = Vec::new();
        for subscription in &settings.subscriptions {
            let policy = FilterPolicy::from(subscription.filter.clone());
            registry.bind(&settings.broker.topic, &subscription.queue, policy);
            queues.push(Arc::new(Queue::durable(
                subscription.queue.as_str(),
                store.queue_store(&subscription.queue)?,
            )?));
        }
        Self::new(registry, queues)
    }

    /// Publishes a message onto `topic` and fans it out to every
    /// subscription whose filter matches.
    ///
    /// Returns the assigned message id once every matching queue has
    /// accepted its copy. Zero matching subscriptions is a success; the
    /// message is dropped. An unknown topic fails with
    /// [`Error::TopicNotFound`].
    pub fn publish(
        &self,
        topic: &str,
        body: impl Into<String>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<Uuid> {
        let Some(subscriptions) = self.registry.subscriptions_for(topic) else {
            return Err(Error::TopicNotFound(topic.to_string()));
        };

        let message = Message::new(body, attributes);
        let mut delivered = 0usize;
        for subscription in subscriptions {
            if !subscription.filter.matches(&message) {
                continue;
            }
            let queue = self.queue(&subscription.queue)?;
            enqueue_with_retry(queue.as_ref(), &message)?;
            delivered += 1;
        }
        debug!(topic, id = %message.id, queues = delivered, "published");
        Ok(message.id)
    }

    /// Looks up a queue by name.
    pub fn queue(&self, name: &str) -> Result<&Arc<Queue>> {
        self.queues
            .get(name)
            .ok_or_else(|| Error::QueueNotFound(name.to_string()))
    }

    /// Receives a batch from the named queue.
    pub fn receive(
        &self,
        queue: &str,
        batch_size: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<Message>> {
        Ok(self.queue(queue)?.receive(batch_size, visibility_timeout))
    }

    /// Acknowledges a message on the named queue.
    pub fn delete(&self, queue: &str, message_id: Uuid) -> Result<()> {
        self.queue(queue)?.delete(message_id)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Arc<Queue>> {
        self.queues.values()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }
}

/// Enqueue is idempotent by message id, so repeating it after a transient
/// storage fault cannot double-deliver. Partial fan-out therefore resolves
/// to either full delivery or a publish error the producer can retry
/// wholesale.
fn enqueue_with_retry(queue: &Queue, message: &Message) -> Result<()> {
    let mut attempt = 0;
    loop {
        match queue.enqueue(message.clone()) {
            Ok(()) => return Ok(()),
            Err(err) => {
                attempt += 1;
                if attempt >= ENQUEUE_ATTEMPTS {
                    return Err(Error::Delivery {
                        queue: queue.name().to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                warn!(queue = queue.name(), error = %err, attempt, "enqueue failed, retrying");
            }
        }
    }
}
