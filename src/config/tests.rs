use super::settings::Settings;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.log_level, "info");
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.topic, "customer-requests");
    assert_eq!(settings.broker.visibility_timeout_secs, 30);
    assert_eq!(settings.broker.batch_size, 10);
}

#[test]
fn test_default_topology() {
    let settings = Settings::default();
    let queues: Vec<&str> = settings
        .subscriptions
        .iter()
        .map(|s| s.queue.as_str())
        .collect();
    assert_eq!(queues, ["AllCustomers", "GoldCustomers", "PlatinumCustomers"]);

    let all = &settings.subscriptions[0];
    assert!(all.filter.is_empty());
    assert_eq!(all.handler, "all_customers");

    let gold = &settings.subscriptions[1];
    assert_eq!(gold.filter["customer_type"], vec!["Gold".to_string()]);

    let platinum = &settings.subscriptions[2];
    assert_eq!(platinum.filter["customer_type"], vec!["Platinum".to_string()]);
}
