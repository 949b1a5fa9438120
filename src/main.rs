use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use fanq::broker::Broker;
use fanq::broker::worker::{WorkerSet, WorkerSettings};
use fanq::config::load_config;
use fanq::consumer::handler_for;
use fanq::persistence::Store;
use fanq::transport::websocket::start_websocket_server;
use fanq::utils::logging;

#[tokio::main]
async fn main() {
    let settings = load_config().expect("Failed to load configuration");
    logging::init(&settings.log_level);

    let store = Store::open(&settings.broker.data_dir).expect("Failed to open message store");
    let broker =
        Arc::new(Broker::from_settings(&settings, &store).expect("Failed to build broker"));

    let worker_settings = WorkerSettings {
        batch_size: settings.broker.batch_size,
        visibility_timeout: Duration::from_secs(settings.broker.visibility_timeout_secs),
        poll_backoff: Duration::from_millis(settings.broker.poll_backoff_ms),
    };
    let reap_interval = Duration::from_millis(settings.broker.reap_interval_ms);

    let mut workers = WorkerSet::new();
    for subscription in &settings.subscriptions {
        let handler = handler_for(&subscription.handler).unwrap_or_else(|| {
            panic!(
                "Unknown handler `{}` for queue `{}`",
                subscription.handler, subscription.queue
            )
        });
        let queue = broker
            .queue(&subscription.queue)
            .expect("queue registered at startup")
            .clone();
        workers.spawn_reaper(queue.clone(), reap_interval);
        workers.spawn_worker(queue, handler, worker_settings.clone());
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tokio::select! {
        result = start_websocket_server(&addr, broker.clone()) => {
            if let Err(err) = result {
                error!(error = %err, "publish endpoint failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    workers.shutdown().await;
}
