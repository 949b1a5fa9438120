use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tungstenite::protocol::Message as WsMessage;

use fanq::broker::Broker;
use fanq::broker::message::{AttributeValue, Message};
use fanq::broker::queue::Queue;
use fanq::broker::worker::{HandlerError, WorkerSet, WorkerSettings};
use fanq::config::Settings;
use fanq::persistence::Store;
use fanq::transport::message::ServerMessage;
use fanq::transport::websocket::start_websocket_server;

#[test]
fn durable_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = Message::new("req1", HashMap::new());
    let second = Message::new("req2", HashMap::new());
    {
        let store = Store::open(dir.path()).unwrap();
        let queue = Queue::durable("AllCustomers", store.queue_store("AllCustomers").unwrap())
            .unwrap();
        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second.clone()).unwrap();

        // one message goes in flight and is never acknowledged
        let batch = queue.receive(1, Duration::from_secs(30));
        assert_eq!(batch.len(), 1);
    }

    // next process generation: in-flight state is gone, both messages are
    // deliverable again
    let store = Store::open(dir.path()).unwrap();
    let queue =
        Queue::durable("AllCustomers", store.queue_store("AllCustomers").unwrap()).unwrap();
    assert_eq!(queue.visible_len(), 2);

    let batch = queue.receive(10, Duration::from_secs(30));
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].id, first.id);
    assert_eq!(batch[1].id, second.id);
}

#[test]
fn acknowledged_message_does_not_come_back_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    let message = Message::new("req1", HashMap::new());
    {
        let store = Store::open(dir.path()).unwrap();
        let queue = Queue::durable("AllCustomers", store.queue_store("AllCustomers").unwrap())
            .unwrap();
        queue.enqueue(message.clone()).unwrap();
        queue.receive(10, Duration::from_secs(30));
        queue.delete(message.id).unwrap();
    }

    let store = Store::open(dir.path()).unwrap();
    let queue =
        Queue::durable("AllCustomers", store.queue_store("AllCustomers").unwrap()).unwrap();
    assert_eq!(queue.visible_len(), 0);
}

fn test_settings(data_dir: &std::path::Path, port: u16) -> Settings {
    let mut settings = Settings::default();
    settings.broker.data_dir = data_dir.display().to_string();
    settings.server.port = port;
    settings
}

#[tokio::test]
async fn workers_drain_the_default_topology() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path(), 0);
    let store = Store::open(dir.path()).unwrap();
    let broker = Arc::new(Broker::from_settings(&settings, &store).unwrap());

    let handled = Arc::new(AtomicUsize::new(0));
    let mut workers = WorkerSet::new();
    for subscription in &settings.subscriptions {
        let seen = handled.clone();
        let handler = Arc::new(move |_: &Message| -> Result<(), HandlerError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let queue = broker.queue(&subscription.queue).unwrap().clone();
        workers.spawn_reaper(queue.clone(), Duration::from_millis(50));
        workers.spawn_worker(
            queue,
            handler,
            WorkerSettings {
                batch_size: 10,
                visibility_timeout: Duration::from_secs(30),
                poll_backoff: Duration::from_millis(10),
            },
        );
    }

    let gold = HashMap::from([("customer_type".to_string(), AttributeValue::from("Gold"))]);
    broker.publish("customer-requests", "req1", gold).unwrap();
    broker
        .publish("customer-requests", "req2", HashMap::new())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    workers.shutdown().await;

    // req1 lands on AllCustomers and GoldCustomers, req2 only on AllCustomers
    assert_eq!(handled.load(Ordering::SeqCst), 3);
    for queue in broker.queues() {
        assert_eq!(queue.visible_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
    }
}

#[tokio::test]
async fn integration_publish_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let addr = "127.0.0.1:9801";
    let settings = test_settings(dir.path(), 9801);
    let store = Store::open(dir.path()).unwrap();
    let broker = Arc::new(Broker::from_settings(&settings, &store).unwrap());

    let server_broker = broker.clone();
    tokio::spawn(async move {
        let _ = start_websocket_server(addr, server_broker).await;
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (mut producer, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("producer connect");

    let frame = serde_json::json!({
        "type": "publish",
        "topic": "customer-requests",
        "body": "req1",
        "attributes": { "customer_type": "Platinum" }
    })
    .to_string();
    producer.send(WsMessage::text(frame)).await.unwrap();

    let reply = producer.next().await.expect("reply").unwrap();
    let reply: ServerMessage = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    let id = match reply {
        ServerMessage::Published { id } => id,
        ServerMessage::Error { reason } => panic!("publish failed: {reason}"),
    };

    // exactly two deliveries: AllCustomers and PlatinumCustomers
    let all = broker
        .receive("AllCustomers", 10, Duration::from_secs(30))
        .unwrap();
    let gold = broker
        .receive("GoldCustomers", 10, Duration::from_secs(30))
        .unwrap();
    let platinum = broker
        .receive("PlatinumCustomers", 10, Duration::from_secs(30))
        .unwrap();

    assert_eq!(all.len(), 1);
    assert!(gold.is_empty());
    assert_eq!(platinum.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(platinum[0].id, id);

    // unknown topic is rejected synchronously
    let bad_frame = serde_json::json!({
        "type": "publish",
        "topic": "orders",
        "body": "req2"
    })
    .to_string();
    producer.send(WsMessage::text(bad_frame)).await.unwrap();
    let reply = producer.next().await.expect("reply").unwrap();
    let reply: ServerMessage = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert!(matches!(reply, ServerMessage::Error { .. }));
}
