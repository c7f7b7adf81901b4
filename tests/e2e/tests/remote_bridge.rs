//! Two runtimes exchanging serialized messages through the loopback broker

use codec::{JsonSerializer, MessageSerializer};
use message_router::test_utils::{init_tracing, wait_until, RecordingStub, RecordingStubFactory};
use messaging_config::StaticRoute;
use messaging_e2e_tests::{fast_config, mqtt, LoopbackBroker};
use rpc::test_utils::{CollectingReplyCaller, RecordingRequestCaller};
use rpc::MessagingRuntime;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use types::{headers, Address, AddressKind, MessageType, OneWay, Request};

const WAIT: Duration = Duration::from_secs(5);

/// Consumer runtime and provider runtime sharing one broker
struct Pair {
    consumer: MessagingRuntime,
    provider: MessagingRuntime,
    broker: Arc<LoopbackBroker>,
}

fn pair() -> Pair {
    init_tracing();

    let mut consumer_config = fast_config();
    consumer_config.runtime.local_receiver_id = "consumer-runtime".to_string();
    consumer_config.routes.push(StaticRoute {
        participant_id: "provider".to_string(),
        address: mqtt("provider-topic"),
    });

    let mut provider_config = fast_config();
    provider_config.runtime.local_receiver_id = "provider-runtime".to_string();
    provider_config.routes.push(StaticRoute {
        participant_id: "consumer".to_string(),
        address: mqtt("consumer-topic"),
    });

    let consumer = MessagingRuntime::new(consumer_config).unwrap();
    let provider = MessagingRuntime::new(provider_config).unwrap();

    let broker = LoopbackBroker::new();
    broker.attach(&consumer);
    broker.attach(&provider);

    Pair {
        consumer,
        provider,
        broker,
    }
}

#[tokio::test]
async fn test_round_trip_over_serialized_transport() {
    let p = pair();
    p.broker.subscribe("provider-topic", p.provider.dispatcher());
    p.broker.subscribe("consumer-topic", p.consumer.dispatcher());
    p.provider
        .register_provider("provider", Arc::new(RecordingRequestCaller::new()));

    let reply = p
        .consumer
        .manager()
        .send_sync_request(
            "consumer",
            "provider",
            Request::new("getLocation", vec![json!({"lat": 48.1, "lon": 11.6})]),
            WAIT,
        )
        .await
        .unwrap();

    assert_eq!(reply.response, vec![json!({"lat": 48.1, "lon": 11.6})]);
    assert_eq!(p.broker.delivered(), 2);
    assert_eq!(p.consumer.router().stats().transmit_attempts, 1);
    assert_eq!(p.provider.router().stats().transmit_attempts, 1);

    p.consumer.shutdown().await;
    p.provider.shutdown().await;
}

#[tokio::test]
async fn test_send_retried_until_subscriber_appears() {
    let p = pair();
    p.broker.subscribe("consumer-topic", p.consumer.dispatcher());
    p.provider
        .register_provider("provider", Arc::new(RecordingRequestCaller::new()));

    let reply_caller = Arc::new(CollectingReplyCaller::new());
    p.consumer
        .manager()
        .send_request(
            "consumer",
            "provider",
            Request::new("ping", vec![]),
            WAIT,
            reply_caller.clone(),
        )
        .unwrap();

    let router = p.consumer.router().clone();
    assert!(wait_until(WAIT, || router.stats().retries_scheduled >= 2).await);
    assert!(reply_caller.replies().is_empty());

    p.broker.subscribe("provider-topic", p.provider.dispatcher());

    assert!(reply_caller.wait_for(1, WAIT).await);
    assert_eq!(reply_caller.replies().len(), 1);

    p.consumer.shutdown().await;
    p.provider.shutdown().await;
}

#[tokio::test]
async fn test_remote_one_way_buffered_on_receiving_side() {
    let p = pair();
    p.broker.subscribe("provider-topic", p.provider.dispatcher());

    p.consumer
        .manager()
        .send_one_way("consumer", "provider", OneWay::new("early"), WAIT)
        .unwrap();

    let dispatcher = p.provider.dispatcher().clone();
    assert!(wait_until(WAIT, || dispatcher.buffered_len("provider") == 1).await);

    let recipient = Arc::new(rpc::test_utils::RecordingOneWayRecipient::new());
    p.provider
        .register_one_way_recipient("provider", recipient.clone());
    assert_eq!(recipient.received()[0].payload, json!("early"));

    p.consumer.shutdown().await;
    p.provider.shutdown().await;
}

#[tokio::test]
async fn test_reply_to_header_on_outgoing_requests() {
    init_tracing();
    let reply_to = Address::mqtt("tcp://broker:1883", "replies/consumer");
    let mut config = fast_config();
    config.runtime.reply_to_address = Some(reply_to.clone());
    config.routes.push(StaticRoute {
        participant_id: "remote".to_string(),
        address: Address::mqtt("tcp://broker:1883", "remote"),
    });

    let runtime = MessagingRuntime::new(config).unwrap();
    let stub = Arc::new(RecordingStub::new());
    runtime
        .stub_factory()
        .register(AddressKind::Mqtt, Arc::new(RecordingStubFactory::new(stub.clone())));

    runtime
        .manager()
        .send_request(
            "consumer",
            "remote",
            Request::new("m", vec![]),
            WAIT,
            Arc::new(CollectingReplyCaller::new()),
        )
        .unwrap();
    runtime
        .manager()
        .send_one_way("consumer", "remote", OneWay::new("x"), WAIT)
        .unwrap();

    assert!(stub.wait_for_serialized(2, WAIT).await);
    assert_eq!(stub.structured_count(), 0);

    let sent: Vec<_> = stub
        .serialized()
        .iter()
        .map(|bytes| JsonSerializer.deserialize(bytes).unwrap())
        .collect();
    let request = sent
        .iter()
        .find(|m| m.message_type == MessageType::Request)
        .unwrap();
    let one_way = sent
        .iter()
        .find(|m| m.message_type == MessageType::OneWay)
        .unwrap();

    let header: Address = serde_json::from_str(request.header(headers::REPLY_TO).unwrap()).unwrap();
    assert_eq!(header, reply_to);
    assert!(one_way.header(headers::REPLY_TO).is_none());

    runtime.shutdown().await;
}
