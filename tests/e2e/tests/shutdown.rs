//! Runtime shutdown cancels retries and refuses new work

use message_router::test_utils::{init_tracing, wait_until, RecordingStub, RecordingStubFactory};
use message_router::RoutingError;
use messaging_config::StaticRoute;
use messaging_e2e_tests::{fast_config, mqtt};
use rpc::{MessagingRuntime, SendError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use types::{AddressKind, OneWay};

#[tokio::test]
async fn test_shutdown_cancels_pending_retries() {
    init_tracing();
    let mut config = fast_config();
    config.routes.push(StaticRoute {
        participant_id: "unreachable".to_string(),
        address: mqtt("unreachable"),
    });
    let runtime = MessagingRuntime::new(config).unwrap();

    let stub = Arc::new(RecordingStub::new().failing_first(u32::MAX));
    runtime
        .stub_factory()
        .register(AddressKind::Mqtt, Arc::new(RecordingStubFactory::new(stub.clone())));

    runtime
        .manager()
        .send_one_way(
            "sender",
            "unreachable",
            OneWay::new("never delivered"),
            Duration::from_secs(60),
        )
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || stub.failures() >= 2).await);

    let started = Instant::now();
    assert!(runtime.shutdown().await);
    assert!(started.elapsed() < Duration::from_secs(1));

    let failures = stub.failures();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(stub.failures(), failures);
    assert_eq!(stub.serialized_count(), 0);
}

#[tokio::test]
async fn test_new_sends_refused_after_shutdown() {
    init_tracing();
    let runtime = MessagingRuntime::new(fast_config()).unwrap();
    runtime.register_consumer("consumer");
    assert!(runtime.shutdown().await);

    let result = runtime.manager().send_one_way(
        "sender",
        "consumer",
        OneWay::new("late"),
        Duration::from_secs(1),
    );
    assert!(matches!(
        result,
        Err(SendError::Routing(RoutingError::Shutdown { .. }))
    ));
    assert!(runtime.router().scheduler().is_shut_down());
}
