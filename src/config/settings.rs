use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Covers the publish endpoint, broker tuning, and the subscription
/// topology established at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub log_level: String,
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub subscriptions: Vec<SubscriptionSettings>,
}

/// Configuration settings for the publish endpoint.
///
/// Defines the host and port the WebSocket server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker core.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Topic the configured subscriptions bind to.
    pub topic: String,
    /// Directory of the embedded message store.
    pub data_dir: String,
    /// How long a received message stays hidden before it is redelivered.
    pub visibility_timeout_secs: u64,
    /// Messages per worker poll.
    pub batch_size: usize,
    /// Worker sleep after an empty poll.
    pub poll_backoff_ms: u64,
    /// Background reaper wake interval.
    pub reap_interval_ms: u64,
}

/// One startup-time binding of a queue to the broker topic.
#[derive(Debug, Deserialize, Clone)]
pub struct SubscriptionSettings {
    pub queue: String,
    /// Attribute allowlist. Omitted or empty means the queue receives
    /// every message.
    #[serde(default)]
    pub filter: HashMap<String, Vec<String>>,
    /// Name of the consumer handler bound to the queue.
    pub handler: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled
/// from defaults; a `subscriptions` list replaces the default topology
/// wholesale.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub log_level: Option<String>,
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub subscriptions: Option<Vec<SubscriptionSettings>>,
}

/// Partial server settings.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial broker settings.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub topic: Option<String>,
    pub data_dir: Option<String>,
    pub visibility_timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
    pub poll_backoff_ms: Option<u64>,
    pub reap_interval_ms: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// The default subscription topology is the customer-request fan-out: one
/// unfiltered queue and two tier-filtered queues on a single topic.
impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                topic: "customer-requests".to_string(),
                data_dir: "fanq_db".to_string(),
                visibility_timeout_secs: 30,
                batch_size: 10,
                poll_backoff_ms: 200,
                reap_interval_ms: 1000,
            },
            subscriptions: vec![
                SubscriptionSettings {
                    queue: "AllCustomers".to_string(),
                    filter: HashMap::new(),
                    handler: "all_customers".to_string(),
                },
                SubscriptionSettings {
                    queue: "GoldCustomers".to_string(),
                    filter: HashMap::from([(
                        "customer_type".to_string(),
                        vec!["Gold".to_string()],
                    )]),
                    handler: "tiered_customers".to_string(),
                },
                SubscriptionSettings {
                    queue: "PlatinumCustomers".to_string(),
                    filter: HashMap::from([(
                        "customer_type".to_string(),
                        vec!["Platinum".to_string()],
                    )]),
                    handler: "tiered_customers".to_string(),
                },
            ],
        }
    }
}
