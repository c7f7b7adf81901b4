//! One-way delivery and buffering for recipients that register late

use message_router::test_utils::{init_tracing, wait_until};
use messaging_e2e_tests::fast_config;
use rpc::test_utils::RecordingOneWayRecipient;
use rpc::MessagingRuntime;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use types::OneWay;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_buffered_one_ways_delivered_once_in_submission_order() {
    init_tracing();
    let runtime = MessagingRuntime::new(fast_config()).unwrap();
    runtime
        .router()
        .add_next_hop("listener", runtime.local_address().clone());

    // Every third message expires before the recipient shows up
    for i in 0..9 {
        let ttl = if i % 3 == 2 {
            Duration::from_millis(40)
        } else {
            Duration::from_secs(10)
        };
        runtime
            .manager()
            .send_one_way("sender", "listener", OneWay::new(format!("testPayload {}", i)), ttl)
            .unwrap();
    }

    let dispatcher = runtime.dispatcher().clone();
    assert!(wait_until(WAIT, || dispatcher.buffered_len("listener") == 9).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let recipient = Arc::new(RecordingOneWayRecipient::new());
    runtime.register_one_way_recipient("listener", recipient.clone());

    let expected: Vec<_> = (0..9)
        .filter(|i| i % 3 != 2)
        .map(|i| json!(format!("testPayload {}", i)))
        .collect();
    let received: Vec<_> = recipient.received().into_iter().map(|o| o.payload).collect();
    assert_eq!(received, expected);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recipient.received().len(), expected.len());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_one_way_to_registered_recipient() {
    init_tracing();
    let runtime = MessagingRuntime::new(fast_config()).unwrap();
    let recipient = Arc::new(RecordingOneWayRecipient::new());
    runtime.register_one_way_recipient("listener", recipient.clone());

    runtime
        .manager()
        .send_one_way(
            "sender",
            "listener",
            OneWay::new(json!({"temperature": 21.5})),
            Duration::from_secs(10),
        )
        .unwrap();

    assert!(recipient.wait_for(1, WAIT).await);
    assert_eq!(recipient.received()[0].payload["temperature"], json!(21.5));
    assert!(runtime.shutdown().await);
}
