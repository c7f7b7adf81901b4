//! Runtime built from a configuration file

use messaging_config::{MessagingConfig, OverflowPolicy};
use rpc::test_utils::RecordingRequestCaller;
use rpc::MessagingRuntime;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use types::{Address, Request};

#[tokio::test]
async fn test_runtime_from_config_file() {
    std::env::set_var("E2E_WEATHER_TOPIC", "weather/munich");

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("messaging.toml");
    fs::write(
        &config_path,
        r#"
[router]
scheduler_capacity = 64
send_msg_retry_interval_ms = 50
max_retry_delay_ms = 500

[dispatcher]
reply_wait_multiplier = 1.5
overflow_policy = "reject_newest"
max_buffered_per_participant = 10

[runtime]
local_receiver_id = "e2e-local"

[[routes]]
participant_id = "weather-station"
address = { type = "mqtt", broker_uri = "tcp://loopback:1883", topic = "${E2E_WEATHER_TOPIC}" }
"#,
    )
    .unwrap();

    let config = MessagingConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.dispatcher.overflow_policy, OverflowPolicy::RejectNewest);

    let runtime = MessagingRuntime::new(config).unwrap();
    assert_eq!(runtime.local_address(), &Address::in_process("e2e-local"));
    assert_eq!(
        runtime.routing_table().get("weather-station"),
        Some(Address::mqtt("tcp://loopback:1883", "weather/munich"))
    );

    runtime.register_provider("provider", Arc::new(RecordingRequestCaller::new()));
    runtime.register_consumer("consumer");
    let reply = runtime
        .manager()
        .send_sync_request(
            "consumer",
            "provider",
            Request::new("echo", vec![json!(true)]),
            Duration::from_secs(2),
        )
        .await
        .unwrap();
    assert_eq!(reply.response, vec![json!(true)]);

    assert!(runtime.shutdown().await);
}
