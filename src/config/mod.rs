mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, ServerSettings, Settings, SubscriptionSettings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct with the server, broker and subscription
/// configuration
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        log_level: partial.log_level.unwrap_or(default.log_level),
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            topic: partial
                .broker
                .as_ref()
                .and_then(|b| b.topic.clone())
                .unwrap_or(default.broker.topic),
            data_dir: partial
                .broker
                .as_ref()
                .and_then(|b| b.data_dir.clone())
                .unwrap_or(default.broker.data_dir),
            visibility_timeout_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.visibility_timeout_secs)
                .unwrap_or(default.broker.visibility_timeout_secs),
            batch_size: partial
                .broker
                .as_ref()
                .and_then(|b| b.batch_size)
                .unwrap_or(default.broker.batch_size),
            poll_backoff_ms: partial
                .broker
                .as_ref()
                .and_then(|b| b.poll_backoff_ms)
                .unwrap_or(default.broker.poll_backoff_ms),
            reap_interval_ms: partial
                .broker
                .as_ref()
                .and_then(|b| b.reap_interval_ms)
                .unwrap_or(default.broker.reap_interval_ms),
        },
        subscriptions: partial.subscriptions.unwrap_or(default.subscriptions),
    })
}

#[cfg(test)]
mod tests;
